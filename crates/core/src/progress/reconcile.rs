//! Merging push and poll observations.

use std::time::Duration;

use tracing::debug;

use super::{ProgressError, ProgressStream, ProgressTransport};
use crate::job::Job;

/// Last-writer-wins view of one job, keyed by the snapshot's `updated_at`.
///
/// A snapshot replaces the current view only if it is strictly newer. Once
/// the view is terminal nothing replaces it.
#[derive(Debug, Clone, Default)]
pub struct MergedView {
    current: Option<Job>,
}

impl MergedView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a snapshot from the push channel. Returns whether it was taken.
    pub fn apply_push(&mut self, snapshot: Job) -> bool {
        self.apply(snapshot, "push")
    }

    /// Offer a snapshot from the poll channel. Returns whether it was taken.
    pub fn apply_poll(&mut self, snapshot: Job) -> bool {
        self.apply(snapshot, "poll")
    }

    fn apply(&mut self, snapshot: Job, channel: &str) -> bool {
        if let Some(current) = &self.current {
            if current.status.is_terminal() || snapshot.updated_at <= current.updated_at {
                debug!(
                    job_id = %snapshot.id,
                    channel,
                    offered = %snapshot.updated_at,
                    held = %current.updated_at,
                    "Ignoring stale snapshot"
                );
                return false;
            }
        }
        self.current = Some(snapshot);
        true
    }

    pub fn current(&self) -> Option<&Job> {
        self.current.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|job| job.status.is_terminal())
    }

    /// Delay until the next poll; `None` (never) once terminal.
    pub fn next_poll_delay(&self, interval: Duration) -> Option<Duration> {
        (!self.is_terminal()).then_some(interval)
    }
}

/// Subscribes, retrying `NotFound` up to `attempts` times with a fixed
/// `backoff` to cover the race between submit and subscribe.
pub async fn subscribe_with_retry(
    transport: &dyn ProgressTransport,
    job_id: &str,
    attempts: u32,
    backoff: Duration,
) -> Result<ProgressStream, ProgressError> {
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match transport.subscribe(job_id).await {
            Ok(stream) => return Ok(stream),
            Err(ProgressError::NotFound { .. }) if attempt < attempts => {
                debug!(job_id, attempt, attempts, "Job not visible yet, retrying subscribe");
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(ProgressError::NotFound { .. }) => {
                return Err(ProgressError::NotFound {
                    job_id: job_id.to_string(),
                    attempts,
                })
            }
            Err(e) => return Err(e),
        }
    }
}
