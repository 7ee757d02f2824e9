//! Merged push/poll view for one subscriber.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{subscribe_with_retry, MergedView, ProgressConfig, ProgressError, ProgressStream, ProgressTransport};
use crate::job::Job;

enum Step {
    Push(Option<super::ProgressEvent>),
    Poll,
}

/// Watches one job through push and periodic polling, yielding each view
/// the reconciliation accepts until the job is terminal.
pub struct ProgressObserver {
    transport: Arc<dyn ProgressTransport>,
    job_id: String,
    push: Option<ProgressStream>,
    view: MergedView,
    poll_interval: Duration,
    next_poll: Instant,
}

impl ProgressObserver {
    /// Subscribe to push (retrying while the job is not yet visible) and
    /// poll alongside it.
    pub async fn connect(
        transport: Arc<dyn ProgressTransport>,
        job_id: &str,
        config: &ProgressConfig,
    ) -> Result<Self, ProgressError> {
        let push = subscribe_with_retry(
            transport.as_ref(),
            job_id,
            config.subscribe_attempts,
            config.subscribe_backoff(),
        )
        .await?;
        let poll_interval = config.poll_interval();
        Ok(Self {
            transport,
            job_id: job_id.to_string(),
            push: Some(push),
            view: MergedView::new(),
            poll_interval,
            next_poll: Instant::now() + poll_interval,
        })
    }

    /// Observe by polling alone. The first poll happens immediately.
    pub fn poll_only(
        transport: Arc<dyn ProgressTransport>,
        job_id: &str,
        config: &ProgressConfig,
    ) -> Self {
        Self {
            transport,
            job_id: job_id.to_string(),
            push: None,
            view: MergedView::new(),
            poll_interval: config.poll_interval(),
            next_poll: Instant::now(),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn view(&self) -> &MergedView {
        &self.view
    }

    /// Next accepted view. `None` once the terminal view has been returned,
    /// or when the job can no longer be found.
    pub async fn next_view(&mut self) -> Option<Job> {
        loop {
            if self.view.is_terminal() {
                return None;
            }

            let poll_at = self.next_poll;
            let step = match self.push.as_mut() {
                Some(push) => tokio::select! {
                    event = push.next() => Step::Push(event),
                    _ = tokio::time::sleep_until(poll_at) => Step::Poll,
                },
                None => {
                    tokio::time::sleep_until(poll_at).await;
                    Step::Poll
                }
            };

            match step {
                Step::Push(Some(event)) => {
                    if self.view.apply_push(event.snapshot) {
                        return self.view.current().cloned();
                    }
                }
                Step::Push(None) => {
                    debug!(job_id = %self.job_id, "Push channel ended, continuing with polling");
                    self.push = None;
                }
                Step::Poll => {
                    let polled = self.transport.snapshot(&self.job_id).await;
                    self.next_poll = Instant::now() + self.poll_interval;
                    match polled {
                        Ok(snapshot) => {
                            if self.view.apply_poll(snapshot) {
                                return self.view.current().cloned();
                            }
                        }
                        Err(ProgressError::NotFound { .. }) => {
                            debug!(job_id = %self.job_id, "Job no longer visible, stopping observer");
                            return None;
                        }
                        Err(e) => {
                            warn!(job_id = %self.job_id, error = %e, "Progress poll failed");
                        }
                    }
                }
            }
        }
    }
}
