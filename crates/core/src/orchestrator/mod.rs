//! Job orchestrator.
//!
//! The orchestrator owns the job registry and drives every job through
//! Pending → Processing → {Completed, Failed, Cancelled}:
//! - **Dispatch**: units in ascending order, bounded by `max_parallel_units`
//!   across all jobs
//! - **Progress**: every sub-state change updates the job under its lock and
//!   is published to subscribers
//! - **Completion**: failure thresholds, then final assembly
//!
//! Cancellation is cooperative: it stops further dispatch and lets running
//! units finish.

mod config;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::JobOrchestrator;
pub use types::{JobRequest, OrchestratorError};
