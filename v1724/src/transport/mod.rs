//! Transport mechanisms that can master VME cycles against a digitizer.
//!
//! Everything the board-level code does goes through [`VmeMaster`], so the
//! same logic runs against the simulated digitizer in [`mock`] and, with the
//! `caenvmelib` feature, against real hardware through the vendor driver in
//! [`caen`]. Errors are the driver's own closed status-code set from
//! [`caenvme`]; a transport that has no real driver underneath fabricates
//! the matching code.

#[cfg(feature = "caenvmelib")]
pub mod caen;
pub mod mock;

use caenvme::{
    BltChunk,
    Error,
};

/// One VME master connection to a single board.
///
/// Methods take full 32-bit bus addresses (base + register offset); address
/// modifier and data width are the transport's concern. All cycles are
/// synchronous D32 accesses.
pub trait VmeMaster {
    /// Single-register read cycle.
    /// # Errors
    /// Returns the driver status on a failed cycle.
    fn read_cycle(&mut self, addr: u32) -> Result<u32, Error>;

    /// Single-register write cycle.
    /// # Errors
    /// Returns the driver status on a failed cycle.
    fn write_cycle(&mut self, addr: u32, value: u32) -> Result<(), Error>;

    /// FIFO block-transfer read into `buf`, at most `buf.len()` bytes.
    ///
    /// The bus-error end-of-data sentinel is not an error here; it comes
    /// back as [`BltChunk::end_of_data`].
    /// # Errors
    /// Returns the driver status on any other failed cycle.
    fn blt_read_cycle(&mut self, addr: u32, buf: &mut [u8]) -> Result<BltChunk, Error>;

    /// Release the board handle. Must be called exactly once.
    /// # Errors
    /// Returns the driver status if the teardown itself fails.
    fn close(&mut self) -> Result<(), Error>;
}
