//! Pipeline assembly: configuration, statistics and the orchestrator.

pub mod config;
pub mod orchestrator;
pub mod stats;

pub use config::{ConfigError, PipelineConfig};
pub use orchestrator::{Pipeline, PipelineError, RunOutcome};
pub use stats::{RunStats, StatsReport};
