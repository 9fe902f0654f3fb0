//! Long-haul stress test for a chain of V1724s behind a single optical
//! link, for shaking out intermittent driver and hardware faults. Hook the
//! boards up through an A2818/A3818 card before running; everything else
//! (loop counts, register values, board count) is compiled in.

use caenvme::BoardType;
use tracing::{
    error,
    info,
};
use v1724::{
    stress,
    transport::caen::OpticalLink,
};

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = stress::StressConfig::default();
    info!(
        loops = config.loops,
        boards = config.boards,
        "starting V1724 stress run"
    );

    if let Err(e) = stress::run(&config, |board| {
        OpticalLink::open(BoardType::V2718, 0, u32::from(board))
    }) {
        error!(%e, "stress run aborted");
        std::process::exit(-1);
    }
}
