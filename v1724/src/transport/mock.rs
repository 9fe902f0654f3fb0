//! A simulated digitizer, useful for testing everything above the driver.
//!
//! The mock keeps a flat register memory and reproduces the two behaviors
//! the harness actually depends on: the per-channel DAC busy flag staying up
//! for a configurable number of status reads after a DAC write, and a FIFO
//! of pending events served out through block-transfer reads. Faults can be
//! injected at any point to exercise the error paths.

use super::VmeMaster;
use crate::registers::{
    self,
    CHANNELS,
};
use caenvme::{
    BltChunk,
    Error,
};
use std::collections::{
    HashMap,
    VecDeque,
};

/// A board that exists only in memory.
#[derive(Debug, Default)]
pub struct Mock {
    memory: HashMap<u32, u32>,
    /// How many status reads report busy after each DAC write
    settle_polls: u32,
    busy_left: [u32; CHANNELS as usize],
    events: VecDeque<Vec<u8>>,
    read_fault: Option<(usize, Error)>,
    write_fault: Option<(usize, Error)>,
    blt_fault: Option<Error>,
    close_fault: Option<Error>,
    reads: usize,
    writes: usize,
}

impl Mock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A board whose DACs report busy for `polls` status reads after every
    /// DAC write.
    #[must_use]
    pub fn with_settle_polls(polls: u32) -> Self {
        Self {
            settle_polls: polls,
            ..Self::default()
        }
    }

    /// Queue one event for block-transfer readout.
    pub fn push_event(&mut self, data: Vec<u8>) {
        self.events.push_back(data);
    }

    /// Fail the `nth` upcoming read cycle (0 = the next one) with `error`.
    pub fn fail_read(&mut self, nth: usize, error: Error) {
        self.read_fault = Some((nth, error));
    }

    /// Fail the `nth` upcoming write cycle (0 = the next one) with `error`.
    pub fn fail_write(&mut self, nth: usize, error: Error) {
        self.write_fault = Some((nth, error));
    }

    /// Fail the next block-transfer read with `error`.
    pub fn fail_blt(&mut self, error: Error) {
        self.blt_fault = Some(error);
    }

    /// Fail the close call with `error`.
    pub fn fail_close(&mut self, error: Error) {
        self.close_fault = Some(error);
    }

    /// Total read cycles served so far.
    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads
    }

    /// Total write cycles served so far.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Value last written to `offset`, if any.
    #[must_use]
    pub fn register(&self, offset: u16) -> Option<u32> {
        self.memory
            .get(&(registers::BOARD_VME_BASE + u32::from(offset)))
            .copied()
    }

    fn channel_of(addr: u32, base_offset: u16) -> Option<u8> {
        let offset = addr.checked_sub(registers::BOARD_VME_BASE)?;
        for channel in 0..CHANNELS {
            if offset == u32::from(base_offset) + 0x100 * u32::from(channel) {
                return Some(channel);
            }
        }
        None
    }

    fn take_fault(fault: &mut Option<(usize, Error)>) -> Option<Error> {
        match fault.take() {
            Some((0, e)) => Some(e),
            Some((n, e)) => {
                *fault = Some((n - 1, e));
                None
            }
            None => None,
        }
    }
}

impl VmeMaster for Mock {
    fn read_cycle(&mut self, addr: u32) -> Result<u32, Error> {
        if let Some(e) = Self::take_fault(&mut self.read_fault) {
            return Err(e);
        }
        self.reads += 1;
        let stored = self.memory.get(&addr).copied().unwrap_or(0);
        if let Some(channel) = Self::channel_of(addr, registers::channel_status(0)) {
            let busy = &mut self.busy_left[channel as usize];
            if *busy > 0 {
                *busy -= 1;
                return Ok(stored | 0x4);
            }
            return Ok(stored & !0x4);
        }
        Ok(stored)
    }

    fn write_cycle(&mut self, addr: u32, value: u32) -> Result<(), Error> {
        if let Some(e) = Self::take_fault(&mut self.write_fault) {
            return Err(e);
        }
        self.writes += 1;
        if let Some(channel) = Self::channel_of(addr, registers::channel_dac(0)) {
            self.busy_left[channel as usize] = self.settle_polls;
        }
        self.memory.insert(addr, value);
        Ok(())
    }

    fn blt_read_cycle(&mut self, _addr: u32, buf: &mut [u8]) -> Result<BltChunk, Error> {
        if let Some(e) = self.blt_fault.take() {
            return Err(e);
        }
        match self.events.pop_front() {
            None => Ok(BltChunk {
                bytes: 0,
                end_of_data: true,
            }),
            Some(event) => {
                if event.len() > buf.len() {
                    // More data than room: hand over what fits and keep the
                    // rest pending, like a FIFO would
                    let n = buf.len();
                    buf.copy_from_slice(&event[..n]);
                    self.events.push_front(event[n..].to_vec());
                    Ok(BltChunk {
                        bytes: n,
                        end_of_data: false,
                    })
                } else {
                    buf[..event.len()].copy_from_slice(&event);
                    Ok(BltChunk {
                        bytes: event.len(),
                        end_of_data: self.events.is_empty(),
                    })
                }
            }
        }
    }

    fn close(&mut self) -> Result<(), Error> {
        match self.close_fault.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::{
        channel_dac,
        channel_status,
        BOARD_VME_BASE,
    };

    fn addr(offset: u16) -> u32 {
        BOARD_VME_BASE + u32::from(offset)
    }

    #[test]
    fn test_write_read_roundtrip() {
        let mut mock = Mock::new();
        mock.write_cycle(addr(registers::CHANNEL_MASK), 0xFF).unwrap();
        assert_eq!(mock.read_cycle(addr(registers::CHANNEL_MASK)).unwrap(), 0xFF);
        assert_eq!(mock.register(registers::CHANNEL_MASK), Some(0xFF));
    }

    #[test]
    fn test_unwritten_registers_read_zero() {
        let mut mock = Mock::new();
        assert_eq!(mock.read_cycle(addr(registers::BOARD_INFO)).unwrap(), 0);
    }

    #[test]
    fn test_dac_busy_countdown() {
        let mut mock = Mock::with_settle_polls(2);
        mock.write_cycle(addr(channel_dac(3)), 0x1000).unwrap();
        assert_eq!(mock.read_cycle(addr(channel_status(3))).unwrap() & 0x4, 0x4);
        assert_eq!(mock.read_cycle(addr(channel_status(3))).unwrap() & 0x4, 0x4);
        assert_eq!(mock.read_cycle(addr(channel_status(3))).unwrap() & 0x4, 0x0);
        // Other channels are unaffected
        assert_eq!(mock.read_cycle(addr(channel_status(4))).unwrap() & 0x4, 0x0);
    }

    #[test]
    fn test_blt_serves_events_then_ends() {
        let mut mock = Mock::new();
        mock.push_event(vec![1, 2, 3, 4]);
        mock.push_event(vec![5, 6]);
        let mut buf = [0u8; 16];
        let chunk = mock.blt_read_cycle(BOARD_VME_BASE, &mut buf).unwrap();
        assert_eq!((chunk.bytes, chunk.end_of_data), (4, false));
        let chunk = mock.blt_read_cycle(BOARD_VME_BASE, &mut buf[4..]).unwrap();
        assert_eq!((chunk.bytes, chunk.end_of_data), (2, true));
        assert_eq!(&buf[..6], &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_blt_empty_fifo_ends_immediately() {
        let mut mock = Mock::new();
        let mut buf = [0u8; 8];
        let chunk = mock.blt_read_cycle(BOARD_VME_BASE, &mut buf).unwrap();
        assert_eq!((chunk.bytes, chunk.end_of_data), (0, true));
    }

    #[test]
    fn test_blt_oversized_event_is_split() {
        let mut mock = Mock::new();
        mock.push_event(vec![9; 10]);
        let mut buf = [0u8; 6];
        let chunk = mock.blt_read_cycle(BOARD_VME_BASE, &mut buf).unwrap();
        assert_eq!((chunk.bytes, chunk.end_of_data), (6, false));
        let chunk = mock.blt_read_cycle(BOARD_VME_BASE, &mut buf).unwrap();
        assert_eq!((chunk.bytes, chunk.end_of_data), (4, true));
    }

    #[test]
    fn test_fault_injection_counts_down() {
        let mut mock = Mock::new();
        mock.fail_read(1, Error::CommError);
        assert!(mock.read_cycle(addr(registers::BOARD_INFO)).is_ok());
        assert_eq!(
            mock.read_cycle(addr(registers::BOARD_INFO)),
            Err(Error::CommError)
        );
        // Fault is consumed
        assert!(mock.read_cycle(addr(registers::BOARD_INFO)).is_ok());
    }
}
