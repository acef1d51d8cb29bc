//! Relay orchestration module.

mod input;
mod orchestrator;
mod stats;

pub use input::Submission;
pub use orchestrator::{Relay, RelayConfig};
pub use stats::RunStats;
