//! Prelude (helpful reexports) for this package

#[cfg(feature = "caenvmelib")]
pub use crate::transport::caen::OpticalLink;
pub use crate::{
    digitizer::{
        DacSettings,
        V1724,
    },
    stress::StressConfig,
    transport::{
        mock::Mock,
        VmeMaster,
    },
};
