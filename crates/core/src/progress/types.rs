//! Progress event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::job::{Job, JobStatus};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProgressKind {
    Progress,
    Completed,
    Failed,
    Cancelled,
}

impl ProgressKind {
    pub fn for_status(status: JobStatus) -> Self {
        match status {
            JobStatus::Completed => ProgressKind::Completed,
            JobStatus::Failed => ProgressKind::Failed,
            JobStatus::Cancelled => ProgressKind::Cancelled,
            JobStatus::Pending | JobStatus::Processing => ProgressKind::Progress,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressKind::Progress => "progress",
            ProgressKind::Completed => "completed",
            ProgressKind::Failed => "failed",
            ProgressKind::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProgressKind::Progress)
    }
}

/// One push notification: the full job snapshot at emission time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressEvent {
    pub job_id: String,
    pub kind: ProgressKind,
    pub updated_at: DateTime<Utc>,
    pub snapshot: Job,
}

impl ProgressEvent {
    pub fn from_snapshot(snapshot: Job) -> Self {
        Self {
            job_id: snapshot.id.clone(),
            kind: ProgressKind::for_status(snapshot.status),
            updated_at: snapshot.updated_at,
            snapshot,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.kind.is_terminal()
    }
}

#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("job not found: {job_id} (after {attempts} attempt(s))")]
    NotFound { job_id: String, attempts: u32 },

    #[error("progress transport error: {0}")]
    Transport(String),
}

impl ProgressError {
    pub fn not_found(job_id: impl Into<String>) -> Self {
        Self::NotFound {
            job_id: job_id.into(),
            attempts: 1,
        }
    }
}
