use std::sync::Arc;

use lectern_core::{Config, JobOrchestrator, LocalProgressTransport, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    orchestrator: Arc<JobOrchestrator>,
    transport: LocalProgressTransport,
}

impl AppState {
    pub fn new(config: Config, orchestrator: Arc<JobOrchestrator>) -> Self {
        let transport = orchestrator.transport();
        Self {
            config,
            orchestrator,
            transport,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn orchestrator(&self) -> &JobOrchestrator {
        &self.orchestrator
    }

    pub fn transport(&self) -> &LocalProgressTransport {
        &self.transport
    }
}
