//! Hand-declared bindings to `libCAENVME` with thin safe wrappers.
//!
//! Only the entry points the harness needs are declared. All wrappers
//! translate the raw status code through [`Error::check`] so callers never
//! see a bare integer.

use crate::{
    AddressModifier,
    BltChunk,
    BoardType,
    DataWidth,
    Error,
    Handle,
    SUCCESS,
};
use std::ffi::c_void;
use tracing::trace;

#[allow(non_snake_case)]
mod ffi {
    use std::ffi::c_void;

    #[link(name = "CAENVME")]
    extern "C" {
        pub fn CAENVME_Init(BdType: i32, Link: u32, BdNum: u32, Handle: *mut i32) -> i32;
        pub fn CAENVME_End(Handle: i32) -> i32;
        pub fn CAENVME_ReadCycle(
            Handle: i32,
            Address: u32,
            Data: *mut c_void,
            AM: i32,
            DW: i32,
        ) -> i32;
        pub fn CAENVME_WriteCycle(
            Handle: i32,
            Address: u32,
            Data: *const c_void,
            AM: i32,
            DW: i32,
        ) -> i32;
        pub fn CAENVME_FIFOBLTReadCycle(
            Handle: i32,
            Address: u32,
            Buffer: *mut c_void,
            Size: i32,
            AM: i32,
            DW: i32,
            Count: *mut i32,
        ) -> i32;
    }
}

/// Open one optical link and get a handle back.
/// # Errors
/// Returns the driver's status when the link or board is unreachable.
pub fn init(board: BoardType, link: u32, node: u32) -> Result<Handle, Error> {
    let mut handle = -1i32;
    // Safety: the driver writes the handle through the provided pointer
    let code = unsafe { ffi::CAENVME_Init(board as i32, link, node, &mut handle) };
    Error::check(code)?;
    trace!(?board, link, node, handle, "opened optical link");
    Ok(Handle::from_raw(handle))
}

/// Release a handle and its link.
/// # Errors
/// Returns the driver's status if the close itself fails.
pub fn end(handle: Handle) -> Result<(), Error> {
    trace!(handle = handle.raw(), "closing optical link");
    // Safety: trivially safe FFI call
    let code = unsafe { ffi::CAENVME_End(handle.raw()) };
    Error::check(code)
}

/// Single-register read cycle.
/// # Errors
/// Returns the driver's status on a failed cycle.
pub fn read_cycle(
    handle: Handle,
    addr: u32,
    am: AddressModifier,
    dw: DataWidth,
) -> Result<u32, Error> {
    let mut data = 0u32;
    // Safety: the driver writes at most `dw` bytes into `data`, which is
    // 4 bytes and we never ask for D64 single cycles
    let code = unsafe {
        ffi::CAENVME_ReadCycle(
            handle.raw(),
            addr,
            std::ptr::addr_of_mut!(data).cast::<c_void>(),
            am as i32,
            dw as i32,
        )
    };
    Error::check(code)?;
    trace!("read cycle at {addr:#010x}: {data:#x}");
    Ok(data)
}

/// Single-register write cycle.
/// # Errors
/// Returns the driver's status on a failed cycle.
pub fn write_cycle(
    handle: Handle,
    addr: u32,
    value: u32,
    am: AddressModifier,
    dw: DataWidth,
) -> Result<(), Error> {
    trace!("write cycle at {addr:#010x}: {value:#x}");
    // Safety: the driver reads at most `dw` bytes from `value`
    let code = unsafe {
        ffi::CAENVME_WriteCycle(
            handle.raw(),
            addr,
            std::ptr::addr_of!(value).cast::<c_void>(),
            am as i32,
            dw as i32,
        )
    };
    Error::check(code)
}

/// FIFO-mode block-transfer read into `buf`.
///
/// The bus-error status is the driver's end-of-data sentinel for FIFO
/// reads, so it comes back as a successful [`BltChunk`] with `end_of_data`
/// set; every other non-success status is an error.
/// # Errors
/// Returns the driver's status on anything other than success or the
/// bus-error sentinel.
pub fn fifo_blt_read(
    handle: Handle,
    addr: u32,
    buf: &mut [u8],
    am: AddressModifier,
    dw: DataWidth,
) -> Result<BltChunk, Error> {
    let mut count = 0i32;
    let size = i32::try_from(buf.len()).map_err(|_| Error::InvalidParam)?;
    // Safety: the driver writes at most `size` bytes into `buf` and reports
    // the actual count through `count`
    let code = unsafe {
        ffi::CAENVME_FIFOBLTReadCycle(
            handle.raw(),
            addr,
            buf.as_mut_ptr().cast::<c_void>(),
            size,
            am as i32,
            dw as i32,
            &mut count,
        )
    };
    let bytes = usize::try_from(count).unwrap_or(0);
    trace!("FIFO BLT read at {addr:#010x}: {bytes} bytes (code {code})");
    match code {
        SUCCESS => Ok(BltChunk {
            bytes,
            end_of_data: false,
        }),
        c => match Error::from_code(c) {
            Error::BusError => Ok(BltChunk {
                bytes,
                end_of_data: true,
            }),
            e => Err(e),
        },
    }
}
