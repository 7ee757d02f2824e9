//! Push + snapshot access to job progress.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::debug;

use super::{ProgressBroadcaster, ProgressError, ProgressEvent};
use crate::job::{Job, JobCell, JobRegistry};
use crate::metrics::PROGRESS_LAG_EVENTS;

/// Push stream of one job's events. Ends after the terminal event.
pub type ProgressStream = BoxStream<'static, ProgressEvent>;

/// The two observation paths over a job.
#[async_trait]
pub trait ProgressTransport: Send + Sync {
    /// Push channel. The first item is the current snapshot. Fails with
    /// [`ProgressError::NotFound`] while the job is not visible.
    async fn subscribe(&self, job_id: &str) -> Result<ProgressStream, ProgressError>;

    /// Point-in-time snapshot.
    async fn snapshot(&self, job_id: &str) -> Result<Job, ProgressError>;
}

/// In-process transport over the job registry and broadcaster.
#[derive(Clone)]
pub struct LocalProgressTransport {
    registry: Arc<JobRegistry>,
    broadcaster: Arc<ProgressBroadcaster>,
}

impl LocalProgressTransport {
    pub fn new(registry: Arc<JobRegistry>, broadcaster: Arc<ProgressBroadcaster>) -> Self {
        Self {
            registry,
            broadcaster,
        }
    }
}

#[async_trait]
impl ProgressTransport for LocalProgressTransport {
    async fn subscribe(&self, job_id: &str) -> Result<ProgressStream, ProgressError> {
        let cell = self
            .registry
            .get(job_id)
            .ok_or_else(|| ProgressError::not_found(job_id))?;
        // Subscribe before taking the snapshot so no change falls in between.
        let receiver = self.broadcaster.subscribe(job_id);
        let initial = ProgressEvent::from_snapshot(cell.snapshot());
        Ok(event_stream(initial, receiver, cell))
    }

    async fn snapshot(&self, job_id: &str) -> Result<Job, ProgressError> {
        self.registry
            .snapshot(job_id)
            .map_err(|_| ProgressError::not_found(job_id))
    }
}

struct StreamState {
    job_id: String,
    initial: Option<ProgressEvent>,
    receiver: Option<broadcast::Receiver<ProgressEvent>>,
    cell: Arc<JobCell>,
    last_sent: Option<DateTime<Utc>>,
    done: bool,
}

impl StreamState {
    fn emit(mut self, event: ProgressEvent) -> Option<(ProgressEvent, Self)> {
        self.last_sent = Some(event.updated_at);
        self.done = event.is_terminal();
        Some((event, self))
    }

    fn is_newer(&self, updated_at: DateTime<Utc>) -> bool {
        self.last_sent.map_or(true, |last| updated_at > last)
    }

    /// Fresh snapshot, if it moved past what was already sent.
    fn newer_snapshot(&self) -> Option<ProgressEvent> {
        let snapshot = self.cell.snapshot();
        self.is_newer(snapshot.updated_at)
            .then(|| ProgressEvent::from_snapshot(snapshot))
    }
}

fn event_stream(
    initial: ProgressEvent,
    receiver: Option<broadcast::Receiver<ProgressEvent>>,
    cell: Arc<JobCell>,
) -> ProgressStream {
    let state = StreamState {
        job_id: initial.job_id.clone(),
        initial: Some(initial),
        receiver,
        cell,
        last_sent: None,
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        if state.done {
            return None;
        }
        if let Some(initial) = state.initial.take() {
            return state.emit(initial);
        }

        loop {
            let received = match state.receiver.as_mut() {
                Some(receiver) => receiver.recv().await,
                None => return None,
            };
            match received {
                Ok(event) => {
                    if state.is_newer(event.updated_at) {
                        return state.emit(event);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(job_id = %state.job_id, skipped, "Progress subscriber lagged, resyncing from snapshot");
                    PROGRESS_LAG_EVENTS.inc();
                    if let Some(event) = state.newer_snapshot() {
                        return state.emit(event);
                    }
                }
                Err(RecvError::Closed) => {
                    state.receiver = None;
                    return match state.newer_snapshot() {
                        Some(event) => state.emit(event),
                        None => None,
                    };
                }
            }
        }
    })
    .boxed()
}
