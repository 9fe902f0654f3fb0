//! Register map of the CAEN V1724 digitizer.
//!
//! Offsets are 16 bit and board-local; the bus address is the board's A32
//! base plus the offset. Registers in the `0x1n..` range exist once per
//! channel with a `0x100` stride, so those are exposed as address helpers
//! instead of bare constants. Values and bit meanings follow the V1724
//! register document (UM2110).

use packed_struct::prelude::*;

/// A32 base address the boards are strapped to.
pub const BOARD_VME_BASE: u32 = 0x800D_0000;

/// Channels per board.
pub const CHANNELS: u8 = 8;

pub const CHANNEL_CONFIG: u16 = 0x8000; // channel configuration, common to all channels
pub const BUFFER_ORGANIZATION: u16 = 0x800C; // log2 of the number of event buffers
pub const CUSTOM_SIZE: u16 = 0x8020; // record length in memory locations
pub const DPP_PARAMETERS: u16 = 0x8080; // DPP firmware parameter block
pub const ACQUISITION_CONTROL: u16 = 0x8100; // [2] run/stop
pub const SOFTWARE_TRIGGER: u16 = 0x8108; // write anything to force a trigger
pub const TRIGGER_SOURCE: u16 = 0x810C; // [31] software trigger enable
pub const FRONT_PANEL_IO: u16 = 0x811C; // LVDS/NIM front panel configuration
pub const CHANNEL_MASK: u16 = 0x8120; // [7:0] channel enable mask
pub const BOARD_INFO: u16 = 0x8140; // board model and memory size
pub const VME_CONTROL: u16 = 0xEF00; // [4] enable bus error on block-read end
pub const BLT_EVENT_NUMBER: u16 = 0xEF1C; // events per block transfer
pub const BOARD_RESET: u16 = 0xEF24; // write anything for a software reset

const CHANNEL_STRIDE: u16 = 0x100;
const CHANNEL_STATUS_BASE: u16 = 0x1088;
const CHANNEL_DAC_BASE: u16 = 0x1098;

/// Status register of one channel.
/// Channels are numbered 0 through 7; out-of-range numbers are a caller bug.
#[must_use]
pub fn channel_status(channel: u8) -> u16 {
    debug_assert!(channel < CHANNELS);
    CHANNEL_STATUS_BASE + CHANNEL_STRIDE * u16::from(channel)
}

/// DAC (baseline offset) register of one channel.
#[must_use]
pub fn channel_dac(channel: u8) -> u16 {
    debug_assert!(channel < CHANNELS);
    CHANNEL_DAC_BASE + CHANNEL_STRIDE * u16::from(channel)
}

/// The per-channel status word at `0x1n88`.
#[derive(Debug, PackedStruct, Default, Copy, Clone, PartialEq, Eq)]
#[packed_struct(bit_numbering = "lsb0", size_bytes = "4")]
pub struct ChannelStatus {
    #[packed_field(bits = "0")]
    /// Channel sample memory is full
    pub mem_full: bool,
    #[packed_field(bits = "1")]
    /// Channel sample memory is empty
    pub mem_empty: bool,
    #[packed_field(bits = "2")]
    /// A DAC write is still being applied; the offset is undefined until
    /// this clears
    pub dac_busy: bool,
}

impl ChannelStatus {
    /// Unpack from the 32-bit word a read cycle returns.
    /// # Errors
    /// Propagates `packed_struct` unpacking errors.
    pub fn from_word(word: u32) -> Result<Self, PackingError> {
        Self::unpack(&word.to_be_bytes())
    }
}

/// The acquisition control register at `0x8100`.
#[derive(Debug, PackedStruct, Default, Copy, Clone, PartialEq, Eq)]
#[packed_struct(bit_numbering = "lsb0", size_bytes = "4")]
pub struct AcquisitionControl {
    #[packed_field(bits = "2")]
    /// Acquisition running
    pub run: bool,
    #[packed_field(bits = "3")]
    /// Count accepted triggers only, not all
    pub count_accepted_only: bool,
}

impl AcquisitionControl {
    /// Pack into the 32-bit word a write cycle takes.
    /// # Errors
    /// Propagates `packed_struct` packing errors.
    pub fn to_word(self) -> Result<u32, PackingError> {
        Ok(u32::from_be_bytes(self.pack()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_addresses() {
        assert_eq!(channel_status(0), 0x1088);
        assert_eq!(channel_status(3), 0x1388);
        assert_eq!(channel_dac(0), 0x1098);
        assert_eq!(channel_dac(7), 0x1798);
    }

    #[test]
    fn test_dac_busy_is_bit_two() {
        let status = ChannelStatus::from_word(0x4).unwrap();
        assert!(status.dac_busy);
        assert!(!status.mem_full);
        let status = ChannelStatus::from_word(0x3).unwrap();
        assert!(!status.dac_busy);
        assert!(status.mem_full);
        assert!(status.mem_empty);
    }

    #[test]
    fn test_acquisition_run_word() {
        let word = AcquisitionControl {
            run: true,
            ..Default::default()
        }
        .to_word()
        .unwrap();
        // run is bit 2
        assert_eq!(word, 0x4);
        let word = AcquisitionControl::default().to_word().unwrap();
        assert_eq!(word, 0x0);
    }
}
