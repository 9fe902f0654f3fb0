//! Control and stress-exercise CAEN V1724 digitizers behind a VME
//! optical-link bridge.
//!
//! The V1724 is an 8-channel 100 MS/s digitizer. This crate keeps its
//! register map, board-level operations (configuration, DAC baseline
//! calibration with a settle poll, software-triggered acquisition, FIFO
//! block-transfer readout) and an endurance loop that exercises all of the
//! above until the hardware or the driver misbehaves. Anything that can
//! master VME cycles implements [`transport::VmeMaster`], so the whole
//! stack runs against [`transport::mock::Mock`] in tests and against
//! CAENVMElib (feature `caenvmelib`) on a real crate.

pub mod digitizer;
pub mod prelude;
pub mod registers;
pub mod stress;
pub mod transport;

pub use digitizer::{
    DacSettings,
    V1724,
};
