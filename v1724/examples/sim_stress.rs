//! In this example, we run a miniature stress pass against simulated
//! digitizers, which exercises the whole open/configure/calibrate/read/close
//! path without any hardware attached.

use std::time::Duration;
use v1724::prelude::*;
use v1724::stress;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let config = StressConfig {
        loops: 2,
        boards: 4,
        register_cycles: 2,
        reads: 10,
        dac_iterations: 4,
        dac: DacSettings {
            attempts: 10,
            poll_every: Duration::from_micros(10),
        },
        readout_capacity: 4096,
    };

    stress::run(&config, |board| {
        let mut mock = Mock::with_settle_polls(2);
        // Give each board something to read back
        mock.push_event(vec![board; 128]);
        Ok(mock)
    })?;
    Ok(())
}
