//! Board-level operations on a single V1724.

use crate::registers::{
    self,
    AcquisitionControl,
    ChannelStatus,
    CHANNELS,
};
use crate::transport::VmeMaster;
use std::{
    thread,
    time::Duration,
};
use thiserror::Error;
use tracing::{
    debug,
    error,
    trace,
};

/// Faults a board can produce. Every variant carries enough to point at the
/// failing register or channel, since a stress run ends at the first one.
#[derive(Debug, Error)]
pub enum Error {
    #[error("read cycle at {addr:#010x} failed: {source}")]
    ReadCycle { addr: u32, source: caenvme::Error },
    #[error("write cycle at {addr:#010x} (value {value:#x}) failed: {source}")]
    WriteCycle {
        addr: u32,
        value: u32,
        source: caenvme::Error,
    },
    #[error(
        "DAC on channel {channel} still busy after {attempts} polls (calibration iteration {iteration})"
    )]
    DacSettleTimeout {
        channel: u8,
        iteration: u32,
        attempts: u32,
    },
    #[error("block transfer failed: {source}")]
    BlockTransfer { source: caenvme::Error },
    #[error("event data does not fit the {capacity} byte readout buffer")]
    ReadoutOverflow { capacity: usize },
    #[error("malformed register word: {0}")]
    Word(#[from] packed_struct::PackingError),
}

/// Bounds for the DAC settle poll.
#[derive(Debug, Copy, Clone)]
pub struct DacSettings {
    /// Status reads before giving up on a DAC write
    pub attempts: u32,
    /// Pause between polls while the busy flag is up
    pub poll_every: Duration,
}

impl Default for DacSettings {
    /// Roughly a one second budget at 1 ms per failed poll.
    fn default() -> Self {
        Self {
            attempts: 1000,
            poll_every: Duration::from_millis(1),
        }
    }
}

/// The DAC code applied on a given calibration iteration.
///
/// Alternating between the two codes stresses both settle directions. The
/// parity mapping (even iterations get `0x1500`) is kept exactly as the
/// bring-up procedure has always done it.
#[must_use]
pub fn dac_code(iteration: u32) -> u32 {
    if iteration % 2 == 0 {
        0x1500
    } else {
        0x1000
    }
}

/// Configuration register table written by [`V1724::configure`], in order.
const CONFIG_TABLE: &[(u16, u32)] = &[
    (registers::BOARD_RESET, 0x1),
    (registers::BLT_EVENT_NUMBER, 0x1),
    (registers::VME_CONTROL, 0x10),
    (registers::CHANNEL_MASK, 0xFF),
    (registers::CHANNEL_CONFIG, 0x310),
    (registers::DPP_PARAMETERS, 0x0131_0000),
    (registers::BUFFER_ORGANIZATION, 0xA),
    (registers::CUSTOM_SIZE, 0xC8),
    (registers::FRONT_PANEL_IO, 0x840),
    (registers::ACQUISITION_CONTROL, 0x0),
    (registers::TRIGGER_SOURCE, 0x8000_0000),
];

/// One digitizer behind a [`VmeMaster`] connection.
#[derive(Debug)]
pub struct V1724<T> {
    bus: T,
    base: u32,
}

impl<T> V1724<T>
where
    T: VmeMaster,
{
    /// A board at the default A32 base address.
    #[must_use]
    pub fn new(bus: T) -> Self {
        Self::with_base(bus, registers::BOARD_VME_BASE)
    }

    /// A board at a non-default base address.
    #[must_use]
    pub fn with_base(bus: T, base: u32) -> Self {
        Self { bus, base }
    }

    /// Access to the underlying transport.
    pub fn bus_mut(&mut self) -> &mut T {
        &mut self.bus
    }

    /// Read a board register by offset.
    /// # Errors
    /// Fails on a failed read cycle.
    pub fn read_register(&mut self, offset: u16) -> Result<u32, Error> {
        let addr = self.base + u32::from(offset);
        self.bus.read_cycle(addr).map_err(|source| {
            error!("register read at {addr:#010x} failed: {source}");
            Error::ReadCycle { addr, source }
        })
    }

    /// Write a board register by offset.
    /// # Errors
    /// Fails on a failed write cycle.
    pub fn write_register(&mut self, offset: u16, value: u32) -> Result<(), Error> {
        let addr = self.base + u32::from(offset);
        self.bus.write_cycle(addr, value).map_err(|source| {
            error!("register write at {addr:#010x} (value {value:#x}) failed: {source}");
            Error::WriteCycle { addr, value, source }
        })
    }

    /// Reset the board and write the full acquisition configuration.
    /// # Errors
    /// Fails on the first failed write cycle.
    pub fn configure(&mut self) -> Result<(), Error> {
        debug!("writing configuration registers");
        for &(offset, value) in CONFIG_TABLE {
            self.write_register(offset, value)?;
        }
        Ok(())
    }

    /// Apply one DAC code to one channel and wait for it to take effect.
    ///
    /// The channel status is read once up front (a board that cannot even
    /// report status should fail here, before we touch the DAC), the code is
    /// written, then the status register is polled until the busy flag
    /// clears or the attempt budget runs out. The applied setting must not
    /// be trusted before the busy flag has been seen low.
    /// # Errors
    /// Any failed cycle is fatal; a never-clearing busy flag becomes
    /// [`Error::DacSettleTimeout`].
    pub fn settle_dac(
        &mut self,
        channel: u8,
        code: u32,
        iteration: u32,
        settings: &DacSettings,
    ) -> Result<(), Error> {
        let status_offset = registers::channel_status(channel);
        self.read_register(status_offset)?;
        self.write_register(registers::channel_dac(channel), code)?;
        for _ in 0..settings.attempts {
            let word = self.read_register(status_offset)?;
            let status = ChannelStatus::from_word(word)?;
            if !status.dac_busy {
                trace!("DAC on channel {channel} settled at {code:#x}");
                return Ok(());
            }
            thread::sleep(settings.poll_every);
        }
        Err(Error::DacSettleTimeout {
            channel,
            iteration,
            attempts: settings.attempts,
        })
    }

    /// Run the full DAC calibration pass: every iteration applies the
    /// alternating code to all eight channels. The first failure aborts the
    /// whole pass; there is no partial-success continuation.
    /// # Errors
    /// Propagates the first [`settle_dac`](Self::settle_dac) failure.
    pub fn dac_calibration(
        &mut self,
        iterations: u32,
        settings: &DacSettings,
    ) -> Result<(), Error> {
        debug!(iterations, "starting DAC calibration pass");
        for iteration in 0..iterations {
            let code = dac_code(iteration);
            for channel in 0..CHANNELS {
                self.settle_dac(channel, code, iteration, settings)?;
            }
        }
        Ok(())
    }

    /// Force one event: start the run, fire the software trigger, stop.
    /// # Errors
    /// Fails on the first failed write cycle.
    pub fn software_trigger(&mut self) -> Result<(), Error> {
        let run = AcquisitionControl {
            run: true,
            ..Default::default()
        }
        .to_word()?;
        let stop = AcquisitionControl::default().to_word()?;
        self.write_register(registers::ACQUISITION_CONTROL, run)?;
        self.write_register(registers::SOFTWARE_TRIGGER, 0x1)?;
        // The stop is issued twice on purpose; single writes have been seen
        // to race the acquisition state machine
        self.write_register(registers::ACQUISITION_CONTROL, stop)?;
        self.write_register(registers::ACQUISITION_CONTROL, stop)?;
        Ok(())
    }

    /// Drain the event FIFO into `buf` via block-transfer reads.
    ///
    /// Chunks land in the unfilled tail of `buf`, so nothing can be written
    /// past its end; if the board still has data once `buf` is full, the
    /// drain fails with [`Error::ReadoutOverflow`] instead. Returns the
    /// total byte count. The data itself is not interpreted.
    /// # Errors
    /// Any status other than success or the end-of-data sentinel is fatal.
    pub fn drain(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let capacity = buf.len();
        let mut filled = 0;
        loop {
            if filled == capacity {
                error!(capacity, "readout buffer exhausted with data pending");
                return Err(Error::ReadoutOverflow { capacity });
            }
            let chunk = self
                .bus
                .blt_read_cycle(self.base, &mut buf[filled..])
                .map_err(|source| Error::BlockTransfer { source })?;
            filled += chunk.bytes;
            trace!(bytes = chunk.bytes, filled, "BLT chunk");
            if chunk.end_of_data {
                return Ok(filled);
            }
        }
    }

    /// Release the board handle.
    /// # Errors
    /// Returns the driver status if the teardown fails.
    pub fn close(mut self) -> Result<(), caenvme::Error> {
        self.bus.close()
    }
}
