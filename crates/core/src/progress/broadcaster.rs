//! Per-job push channels.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use tokio::sync::broadcast;
use tracing::debug;

use super::ProgressEvent;
use crate::metrics;

/// Fans out progress events to every subscriber of a job.
///
/// A job's channel is created when the job is registered and dropped right
/// after its terminal event, so receivers see that event followed by
/// `Closed`.
#[derive(Debug)]
pub struct ProgressBroadcaster {
    channels: RwLock<HashMap<String, broadcast::Sender<ProgressEvent>>>,
    capacity: usize,
}

impl ProgressBroadcaster {
    /// Create a new broadcaster with the given per-job channel capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Open the push channel for a job.
    pub fn register(&self, job_id: &str) {
        let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);
        channels
            .entry(job_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0);
    }

    /// Publish an event. Terminal events close the job's channel.
    pub fn publish(&self, event: ProgressEvent) {
        metrics::PROGRESS_EVENTS
            .with_label_values(&[event.kind.as_str()])
            .inc();

        if event.is_terminal() {
            let sender = self
                .channels
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&event.job_id);
            if let Some(sender) = sender {
                debug!(job_id = %event.job_id, kind = event.kind.as_str(), "Publishing terminal event");
                // Ignore send errors - they just mean no one is listening
                let _ = sender.send(event);
            }
            return;
        }

        let channels = self.channels.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(sender) = channels.get(&event.job_id) {
            let _ = sender.send(event);
        }
    }

    /// Receiver for a job's future events, if its channel is still open.
    pub fn subscribe(&self, job_id: &str) -> Option<broadcast::Receiver<ProgressEvent>> {
        self.channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(job_id)
            .map(|sender| sender.subscribe())
    }

    /// Drop a job's channel without a terminal event.
    pub fn remove(&self, job_id: &str) {
        self.channels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(job_id);
    }

    pub fn subscriber_count(&self, job_id: &str) -> usize {
        self.channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(job_id)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    pub fn open_channels(&self) -> usize {
        self.channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for ProgressBroadcaster {
    fn default() -> Self {
        Self::new(64)
    }
}
