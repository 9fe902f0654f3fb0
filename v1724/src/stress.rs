//! The endurance loop: open, configure, calibrate, trigger, read out,
//! close — over and over — to surface intermittent link and board faults.
//!
//! The loop counts are compiled-in; the outer count is astronomical on
//! purpose, since the point is to run until something breaks. Any fault
//! anywhere ends the run immediately so it can be investigated, which is
//! why there is no retry beyond the bounded DAC settle poll.

use crate::digitizer::{
    self,
    DacSettings,
    V1724,
};
use crate::transport::VmeMaster;
use thiserror::Error;
use tracing::{
    debug,
    info,
};

/// Faults that end a stress run, each naming the board it came from.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to open board {board}: {source}")]
    Open { board: u8, source: caenvme::Error },
    #[error("no boards configured")]
    NoBoards,
    #[error("board {board} fault: {source}")]
    Board {
        board: u8,
        source: digitizer::Error,
    },
    #[error("failed to close board {board}: {source}")]
    Close { board: u8, source: caenvme::Error },
}

/// All the knobs of a stress run. The defaults match the long-haul
/// hardware test; tests inject small values.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Outer open/exercise/close iterations
    pub loops: u64,
    /// Boards on the optical-link chain
    pub boards: u8,
    /// Configure + calibrate cycles per outer iteration
    pub register_cycles: u32,
    /// Trigger + readout rounds per configure cycle
    pub reads: u32,
    /// DAC calibration iterations per configure cycle
    pub dac_iterations: u32,
    /// Settle-poll bounds for the calibration
    pub dac: DacSettings,
    /// Readout buffer capacity in bytes, allocated fresh per drain
    pub readout_capacity: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            loops: 1_000_000,
            boards: 8,
            register_cycles: 100,
            reads: 10_000,
            dac_iterations: 100,
            dac: DacSettings::default(),
            readout_capacity: 40_000,
        }
    }
}

/// Run the stress loop, building one transport per board index with `open`.
///
/// Every outer iteration opens all boards, runs `register_cycles` rounds of
/// configuration plus DAC calibration with `reads` trigger/readout rounds
/// inside each, then closes every board. Read-out data is drained and
/// discarded.
/// # Errors
/// The first fault of any kind ends the run.
pub fn run<T, F>(config: &StressConfig, mut open: F) -> Result<(), Error>
where
    T: VmeMaster,
    F: FnMut(u8) -> Result<T, caenvme::Error>,
{
    for loop_counter in 0..config.loops {
        info!(loop_counter, "entering stress iteration");

        let mut boards = Vec::with_capacity(config.boards as usize);
        for board in 0..config.boards {
            let bus = open(board).map_err(|source| Error::Open { board, source })?;
            boards.push(V1724::new(bus));
        }
        if boards.is_empty() {
            return Err(Error::NoBoards);
        }

        for cycle in 0..config.register_cycles {
            debug!(loop_counter, cycle, "configure and calibrate");
            for (board, digitizer) in boards.iter_mut().enumerate() {
                let board = board as u8;
                digitizer
                    .configure()
                    .map_err(|source| Error::Board { board, source })?;
                digitizer
                    .dac_calibration(config.dac_iterations, &config.dac)
                    .map_err(|source| Error::Board { board, source })?;
            }

            debug!(loop_counter, cycle, reads = config.reads, "trigger and read out");
            for _ in 0..config.reads {
                for (board, digitizer) in boards.iter_mut().enumerate() {
                    let board = board as u8;
                    digitizer
                        .software_trigger()
                        .map_err(|source| Error::Board { board, source })?;
                    let mut buf = vec![0u8; config.readout_capacity];
                    let bytes = digitizer
                        .drain(&mut buf)
                        .map_err(|source| Error::Board { board, source })?;
                    debug!(board, bytes, "drained and discarded");
                }
            }
        }

        for (board, digitizer) in boards.into_iter().enumerate() {
            digitizer.close().map_err(|source| Error::Close {
                board: board as u8,
                source,
            })?;
        }
    }
    info!("stress run completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::Mock;
    use std::time::Duration;

    fn tiny() -> StressConfig {
        StressConfig {
            loops: 1,
            boards: 2,
            register_cycles: 1,
            reads: 2,
            dac_iterations: 2,
            dac: DacSettings {
                attempts: 3,
                poll_every: Duration::ZERO,
            },
            readout_capacity: 64,
        }
    }

    #[test]
    fn test_miniature_run_passes() {
        run(&tiny(), |_| Ok(Mock::with_settle_polls(1))).unwrap();
    }

    #[test]
    fn test_open_failure_names_the_board() {
        let err = run(&tiny(), |board| {
            if board == 1 {
                Err(caenvme::Error::CommError)
            } else {
                Ok(Mock::new())
            }
        })
        .unwrap_err();
        assert!(matches!(err, Error::Open { board: 1, .. }));
    }

    #[test]
    fn test_no_boards_is_fatal() {
        let config = StressConfig {
            boards: 0,
            ..tiny()
        };
        let err = run(&config, |_| Ok(Mock::new())).unwrap_err();
        assert!(matches!(err, Error::NoBoards));
    }

    #[test]
    fn test_board_fault_aborts_the_run() {
        let err = run(&tiny(), |board| {
            let mut mock = Mock::new();
            if board == 0 {
                // Survive the configure table, then fail
                mock.fail_write(20, caenvme::Error::BusError);
            }
            Ok(mock)
        })
        .unwrap_err();
        assert!(matches!(err, Error::Board { board: 0, .. }));
    }

    #[test]
    fn test_close_failure_is_fatal() {
        let err = run(&tiny(), |_| {
            let mut mock = Mock::new();
            mock.fail_close(caenvme::Error::GenericError);
            Ok(mock)
        })
        .unwrap_err();
        assert!(matches!(err, Error::Close { board: 0, .. }));
    }
}
