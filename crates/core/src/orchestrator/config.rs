//! Orchestrator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::assembler::AssemblyPolicy;

/// Configuration for the job orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Units processed at once across all jobs.
    /// Sized to what the rendering and TTS backends can take.
    #[serde(default = "default_parallel_units")]
    pub max_parallel_units: usize,

    /// Non-terminal jobs allowed at once (0 = unlimited).
    /// Further submissions are rejected until a job finishes.
    #[serde(default = "default_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// How long a finished job stays queryable (seconds).
    #[serde(default = "default_retention")]
    pub job_retention_secs: u64,

    /// How often the janitor evicts expired jobs (milliseconds).
    #[serde(default = "default_eviction_interval")]
    pub eviction_interval_ms: u64,

    /// A job whose every unit failed ends Failed instead of Completed.
    #[serde(default = "default_true")]
    pub fail_when_all_units_fail: bool,

    /// Fail the job once more than this many units failed.
    #[serde(default)]
    pub max_failed_units: Option<usize>,

    /// Default policy for units without a clip at final assembly.
    #[serde(default)]
    pub assembly_policy: AssemblyPolicy,

    /// Narration languages accepted at submit.
    #[serde(default = "default_languages")]
    pub supported_languages: Vec<String>,

    /// Upper bound on units per job.
    #[serde(default = "default_max_units")]
    pub max_units: usize,

    /// Benchmark records kept for completed jobs (0 = none).
    #[serde(default = "default_benchmark_history")]
    pub benchmark_history_size: usize,
}

fn default_benchmark_history() -> usize {
    100
}

fn default_parallel_units() -> usize {
    4
}

fn default_concurrent_jobs() -> usize {
    16
}

fn default_retention() -> u64 {
    3600 // 1 hour
}

fn default_eviction_interval() -> u64 {
    60_000 // 1 minute
}

fn default_true() -> bool {
    true
}

fn default_languages() -> Vec<String> {
    ["en", "es", "fr", "de", "it", "pt"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_max_units() -> usize {
    200
}

impl OrchestratorConfig {
    pub fn job_retention(&self) -> Duration {
        Duration::from_secs(self.job_retention_secs)
    }

    pub fn eviction_interval(&self) -> Duration {
        Duration::from_millis(self.eviction_interval_ms.max(1))
    }

    pub fn supports_language(&self, language: &str) -> bool {
        self.supported_languages
            .iter()
            .any(|l| l.eq_ignore_ascii_case(language))
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_parallel_units: default_parallel_units(),
            max_concurrent_jobs: default_concurrent_jobs(),
            job_retention_secs: default_retention(),
            eviction_interval_ms: default_eviction_interval(),
            fail_when_all_units_fail: true,
            max_failed_units: None,
            assembly_policy: AssemblyPolicy::default(),
            supported_languages: default_languages(),
            max_units: default_max_units(),
            benchmark_history_size: default_benchmark_history(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.max_parallel_units, 4);
        assert_eq!(config.max_concurrent_jobs, 16);
        assert_eq!(config.job_retention(), Duration::from_secs(3600));
        assert!(config.fail_when_all_units_fail);
        assert_eq!(config.max_failed_units, None);
        assert_eq!(config.assembly_policy, AssemblyPolicy::SkipFailed);
        assert_eq!(config.benchmark_history_size, 100);
        assert!(config.supports_language("EN"));
        assert!(!config.supports_language("xx"));
    }

    #[test]
    fn test_deserialize_minimal() {
        let toml = r#"
            max_parallel_units = 8
        "#;
        let config: OrchestratorConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.max_parallel_units, 8);
        assert_eq!(config.max_units, 200);
        assert!(config.fail_when_all_units_fail);
    }

    #[test]
    fn test_deserialize_full() {
        let toml = r#"
            max_parallel_units = 2
            max_concurrent_jobs = 0
            job_retention_secs = 60
            eviction_interval_ms = 500
            fail_when_all_units_fail = false
            max_failed_units = 3
            assembly_policy = "fail_fatal"
            supported_languages = ["en"]
            max_units = 10
            benchmark_history_size = 5
        "#;
        let config: OrchestratorConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.max_concurrent_jobs, 0);
        assert_eq!(config.eviction_interval(), Duration::from_millis(500));
        assert!(!config.fail_when_all_units_fail);
        assert_eq!(config.max_failed_units, Some(3));
        assert_eq!(config.assembly_policy, AssemblyPolicy::FailFatal);
        assert_eq!(config.supported_languages, vec!["en"]);
        assert_eq!(config.max_units, 10);
        assert_eq!(config.benchmark_history_size, 5);
    }
}
