use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::collaborators::CollaboratorsConfig;
use crate::orchestrator::OrchestratorConfig;
use crate::processor::ProcessorConfig;
use crate::progress::ProgressConfig;

/// Root configuration. Every section has defaults, so an empty file is valid.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub processor: ProcessorConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
    #[serde(default)]
    pub collaborators: CollaboratorsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Narration cache storage backend.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    #[default]
    Sqlite,
    Memory,
}

/// Narration cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,
    /// SQLite database file (ignored by the memory backend).
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            path: default_cache_path(),
        }
    }
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("lectern-cache.db")
}

/// Sanitized config for API responses (collaborator URLs redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub orchestrator: OrchestratorConfig,
    pub processor: ProcessorConfig,
    pub progress: ProgressConfig,
    pub collaborators: SanitizedCollaboratorsConfig,
}

/// Only whether each collaborator endpoint is set.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedCollaboratorsConfig {
    pub narration_configured: bool,
    pub quiz_configured: bool,
    pub render_configured: bool,
    pub concat_configured: bool,
    pub request_timeout_secs: Option<u64>,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let c = &config.collaborators;
        Self {
            server: config.server.clone(),
            cache: config.cache.clone(),
            orchestrator: config.orchestrator.clone(),
            processor: config.processor.clone(),
            progress: config.progress.clone(),
            collaborators: SanitizedCollaboratorsConfig {
                narration_configured: c.narration_url.is_some(),
                quiz_configured: c.quiz_url.is_some(),
                render_configured: c.render_url.is_some(),
                concat_configured: c.concat_url.is_some(),
                request_timeout_secs: c.request_timeout_secs,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::AssemblyPolicy;

    #[test]
    fn test_deserialize_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.cache.backend, CacheBackend::Sqlite);
        assert_eq!(config.cache.path.to_str().unwrap(), "lectern-cache.db");
        assert!(config.orchestrator.fail_when_all_units_fail);
    }

    #[test]
    fn test_deserialize_sections() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 9000

[cache]
backend = "memory"

[orchestrator]
max_parallel_units = 2
assembly_policy = "fail_fatal"
supported_languages = ["en", "it"]

[processor.retry]
max_attempts = 5
initial_delay_ms = 10

[collaborators]
narration_url = "http://narrator.local/generate"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.cache.backend, CacheBackend::Memory);
        assert_eq!(config.orchestrator.max_parallel_units, 2);
        assert_eq!(config.orchestrator.assembly_policy, AssemblyPolicy::FailFatal);
        assert_eq!(config.orchestrator.supported_languages, vec!["en", "it"]);
        assert_eq!(config.processor.retry.max_attempts, 5);
        assert_eq!(config.processor.retry.initial_delay_ms, 10);
        assert_eq!(config.processor.retry.backoff_multiplier, 2.0);
        assert_eq!(
            config.collaborators.narration_url.as_deref(),
            Some("http://narrator.local/generate")
        );
    }

    #[test]
    fn test_sanitized_config_hides_urls() {
        let mut config = Config::default();
        config.collaborators.render_url = Some("http://secret-render:9000".to_string());

        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.collaborators.render_configured);
        assert!(!sanitized.collaborators.narration_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("secret-render"));
    }
}
