//! Progress propagation configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Buffered events per job before slow subscribers lag.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Subscribe attempts while a job is not yet visible.
    #[serde(default = "default_subscribe_attempts")]
    pub subscribe_attempts: u32,

    /// Fixed delay between subscribe attempts (milliseconds).
    #[serde(default = "default_subscribe_backoff")]
    pub subscribe_backoff_ms: u64,

    /// Snapshot poll interval for observers (milliseconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// WebSocket heartbeat interval (seconds).
    #[serde(default = "default_heartbeat")]
    pub heartbeat_secs: u64,
}

fn default_channel_capacity() -> usize {
    64
}

fn default_subscribe_attempts() -> u32 {
    5
}

fn default_subscribe_backoff() -> u64 {
    1000
}

fn default_poll_interval() -> u64 {
    2000
}

fn default_heartbeat() -> u64 {
    15
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            subscribe_attempts: default_subscribe_attempts(),
            subscribe_backoff_ms: default_subscribe_backoff(),
            poll_interval_ms: default_poll_interval(),
            heartbeat_secs: default_heartbeat(),
        }
    }
}

impl ProgressConfig {
    pub fn subscribe_backoff(&self) -> Duration {
        Duration::from_millis(self.subscribe_backoff_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs.max(1))
    }
}
