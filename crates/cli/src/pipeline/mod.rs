//! Simulation orchestration.

mod orchestrator;
mod stats;

pub use orchestrator::{Simulation, SimulationConfig};
pub use stats::SimulationStats;
