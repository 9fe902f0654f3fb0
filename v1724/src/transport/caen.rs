//! The real transport: VME cycles through CAENVMElib.
//!
//! One [`OpticalLink`] is one open driver handle to one board on the
//! optical-link chain. Single cycles go out as A32/D32 data accesses and
//! readout as A32/D32 FIFO BLT, matching how the V1724 is strapped.

use super::VmeMaster;
use caenvme::{
    raw,
    AddressModifier,
    BltChunk,
    BoardType,
    DataWidth,
    Error,
    Handle,
};

/// A board reached through the vendor driver.
#[derive(Debug)]
pub struct OpticalLink {
    handle: Handle,
    closed: bool,
}

impl OpticalLink {
    /// Open `node` on optical link `link` through a `board`-type bridge.
    /// # Errors
    /// Returns the driver status when the link or board is unreachable.
    pub fn open(board: BoardType, link: u32, node: u32) -> Result<Self, Error> {
        let handle = raw::init(board, link, node)?;
        Ok(Self {
            handle,
            closed: false,
        })
    }
}

impl VmeMaster for OpticalLink {
    fn read_cycle(&mut self, addr: u32) -> Result<u32, Error> {
        raw::read_cycle(
            self.handle,
            addr,
            AddressModifier::A32UserData,
            DataWidth::D32,
        )
    }

    fn write_cycle(&mut self, addr: u32, value: u32) -> Result<(), Error> {
        raw::write_cycle(
            self.handle,
            addr,
            value,
            AddressModifier::A32UserData,
            DataWidth::D32,
        )
    }

    fn blt_read_cycle(&mut self, addr: u32, buf: &mut [u8]) -> Result<BltChunk, Error> {
        raw::fifo_blt_read(
            self.handle,
            addr,
            buf,
            AddressModifier::A32UserBlt,
            DataWidth::D32,
        )
    }

    fn close(&mut self) -> Result<(), Error> {
        self.closed = true;
        raw::end(self.handle)
    }
}

impl Drop for OpticalLink {
    fn drop(&mut self) {
        // Explicit close is the checked path; this only stops a leaked
        // handle from wedging the driver
        if !self.closed {
            let _ = raw::end(self.handle);
        }
    }
}
