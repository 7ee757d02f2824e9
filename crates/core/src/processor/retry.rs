//! Bounded retry loop for collaborator calls.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::RetryConfig;
use crate::collaborators::CollaboratorError;
use crate::metrics;

/// Runs `call` until it succeeds, fails with a non-retryable error, or
/// `policy.max_attempts` attempts have been made.
///
/// With `timeout` set, each attempt is bounded by it and an expired attempt
/// counts as [`CollaboratorError::Timeout`]. `operation` labels logs and the
/// retry counter; `unit_number` is `None` for job-level calls.
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryConfig,
    timeout: Option<Duration>,
    operation: &str,
    unit_number: Option<u32>,
    mut call: F,
) -> Result<T, CollaboratorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CollaboratorError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let outcome = match timeout {
            Some(limit) => tokio::time::timeout(limit, call())
                .await
                .unwrap_or(Err(CollaboratorError::Timeout(limit.as_millis() as u64))),
            None => call().await,
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    unit = unit_number,
                    operation,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying collaborator call"
                );
                metrics::COLLABORATOR_RETRIES
                    .with_label_values(&[operation])
                    .inc();
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
