//! Configuration for the unit processor.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::collaborators::Difficulty;

/// Configuration for per-unit processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Narration model identifier. Part of the cache key, so bumping it
    /// invalidates every cached narration.
    #[serde(default = "default_model_version")]
    pub model_version: String,

    /// Render with the unit's own text when narration fails.
    #[serde(default = "default_true")]
    pub placeholder_narration: bool,

    /// Deadline for each collaborator call. Unset means wait until complete.
    #[serde(default)]
    pub stage_timeout_ms: Option<u64>,

    /// Difficulty tiers requested from the quiz collaborator.
    #[serde(default = "default_quiz_tiers")]
    pub quiz_tiers: Vec<Difficulty>,

    /// Retry configuration.
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Retry policy for transient collaborator failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum attempts per stage, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry in milliseconds.
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Upper bound on any single delay in milliseconds.
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Exponential backoff multiplier.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_model_version() -> String {
    "narrator-v1".to_string()
}

fn default_true() -> bool {
    true
}

fn default_quiz_tiers() -> Vec<Difficulty> {
    vec![Difficulty::Easy, Difficulty::Medium, Difficulty::Hard]
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> u64 {
    500
}

fn default_max_delay() -> u64 {
    10_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryConfig {
    /// Delay before retry `n` (1-based): `min(initial * multiplier^(n-1), max)`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1) as i32;
        let delay = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        let capped = delay.min(self.max_delay_ms as f64);
        Duration::from_millis(capped as u64)
    }

    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            model_version: default_model_version(),
            placeholder_narration: true,
            stage_timeout_ms: None,
            quiz_tiers: default_quiz_tiers(),
            retry: RetryConfig::default(),
        }
    }
}

impl ProcessorConfig {
    pub fn stage_timeout(&self) -> Option<Duration> {
        self.stage_timeout_ms.map(Duration::from_millis)
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the per-call deadline.
    pub fn with_stage_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.stage_timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_placeholder_narration(mut self, enabled: bool) -> Self {
        self.placeholder_narration = enabled;
        self
    }
}
