//! Job records, per-unit sub-states, and the in-memory job registry.
//!
//! A [`Job`] is the single source of truth for one job's lifecycle. All
//! mutations go through [`JobCell::update`], which holds a short lock so the
//! orchestrator and the per-unit workers can interleave safely.

mod registry;
mod types;

pub use registry::{JobCell, JobRegistry};
pub use types::{
    Job, JobMode, JobResult, JobStatus, JobSummary, Stage, StagePlan, StageState, UnitStatus,
};

use thiserror::Error;

/// Errors raised by job state changes and lookups.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("job not found: {0}")]
    NotFound(String),

    #[error("invalid status transition for job {job_id}: {from} -> {to}")]
    InvalidTransition {
        job_id: String,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("unit {unit_number} not found in job {job_id}")]
    UnitNotFound { job_id: String, unit_number: u32 },

    #[error("{stage} of unit {unit_number} cannot move from {from} to {to}")]
    StageRegression {
        unit_number: u32,
        stage: Stage,
        from: StageState,
        to: StageState,
    },
}
