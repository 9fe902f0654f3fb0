//! Types and bindings for the CAEN VMElib optical-link driver.
//!
//! CAENVMElib talks to VME crates through a V1718/V2718 bridge hooked up to
//! an A2818 or A3818 PCI card. Every driver entry point returns a small
//! negative status code; this crate models that closed set as a proper error
//! type so callers branch on variants instead of comparing integers. The
//! actual FFI surface lives in [`raw`] behind the `link` feature, since the
//! vendor library is only present on hosts with the driver stack installed.

#[cfg(feature = "link")]
pub mod raw;

use num_derive::{
    FromPrimitive,
    ToPrimitive,
};

/// The one status code that means a cycle completed normally (`cvSuccess`).
pub const SUCCESS: i32 = 0;

/// Non-success status codes returned by the driver.
///
/// Note that [`Error::BusError`] is not always a fault: for FIFO block
/// transfers the driver raises it to say "no more data", which transports
/// fold into [`BltChunk::end_of_data`].
#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("VME bus error during the cycle")]
    BusError,
    #[error("communication error on the optical link")]
    CommError,
    #[error("unspecified driver error")]
    GenericError,
    #[error("invalid parameter passed to the driver")]
    InvalidParam,
    #[error("timeout expired inside the driver")]
    Timeout,
    #[error("device is already open")]
    AlreadyOpen,
    #[error("maximum board count exceeded")]
    MaxBoardCount,
    #[error("unrecognized driver status code: {0}")]
    Unknown(i32),
}

impl Error {
    /// Map a raw driver status code onto the error set.
    /// Calling this with [`SUCCESS`] is a caller bug, so it lands in
    /// [`Error::Unknown`] like any other unexpected code.
    #[must_use]
    pub fn from_code(code: i32) -> Self {
        match code {
            -1 => Error::BusError,
            -2 => Error::CommError,
            -3 => Error::GenericError,
            -4 => Error::InvalidParam,
            -5 => Error::Timeout,
            -6 => Error::AlreadyOpen,
            -7 => Error::MaxBoardCount,
            c => Error::Unknown(c),
        }
    }

    /// Turn a raw status code into a `Result`.
    pub fn check(code: i32) -> Result<(), Self> {
        if code == SUCCESS {
            Ok(())
        } else {
            Err(Self::from_code(code))
        }
    }
}

/// An opaque board handle issued by `CAENVME_Init`.
///
/// The driver hands these out per optical link and expects them back in
/// every cycle call until `CAENVME_End`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Handle(i32);

impl Handle {
    #[must_use]
    pub fn from_raw(raw: i32) -> Self {
        Handle(raw)
    }

    #[must_use]
    pub fn raw(self) -> i32 {
        self.0
    }
}

/// The bridge/carrier models the driver can open (`CVBoardTypes`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum BoardType {
    V1718 = 0,
    V2718 = 1,
    A2818 = 2,
    A2719 = 3,
    A3818 = 4,
}

/// VME address modifiers for the transfer modes we issue.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum AddressModifier {
    /// A32 non-privileged MBLT64
    A32UserMblt = 0x08,
    /// A32 non-privileged data access
    A32UserData = 0x09,
    /// A32 non-privileged BLT
    A32UserBlt = 0x0B,
}

/// Data widths for single and block cycles.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum DataWidth {
    D8 = 0x01,
    D16 = 0x02,
    D32 = 0x04,
    D64 = 0x08,
}

/// The outcome of one FIFO block-transfer read.
///
/// `bytes` is how much landed in the caller's buffer. `end_of_data` is set
/// when the driver reported the bus-error sentinel, meaning the board has
/// nothing further to transfer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BltChunk {
    pub bytes: usize,
    pub end_of_data: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::{
        FromPrimitive,
        ToPrimitive,
    };

    #[test]
    fn test_known_codes() {
        assert_eq!(Error::from_code(-1), Error::BusError);
        assert_eq!(Error::from_code(-2), Error::CommError);
        assert_eq!(Error::from_code(-3), Error::GenericError);
        assert_eq!(Error::from_code(-4), Error::InvalidParam);
        assert_eq!(Error::from_code(-5), Error::Timeout);
        assert_eq!(Error::from_code(-42), Error::Unknown(-42));
    }

    #[test]
    fn test_check() {
        assert!(Error::check(SUCCESS).is_ok());
        assert_eq!(Error::check(-1), Err(Error::BusError));
    }

    #[test]
    fn test_modifier_values() {
        assert_eq!(AddressModifier::A32UserData.to_i32(), Some(0x09));
        assert_eq!(AddressModifier::A32UserBlt.to_i32(), Some(0x0B));
        assert_eq!(
            AddressModifier::from_i32(0x08),
            Some(AddressModifier::A32UserMblt)
        );
    }

    #[test]
    fn test_width_values() {
        assert_eq!(DataWidth::D32.to_i32(), Some(4));
        assert_eq!(DataWidth::from_i32(8), Some(DataWidth::D64));
    }
}
