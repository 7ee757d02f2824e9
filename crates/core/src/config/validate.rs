use super::{types::Config, ConfigError};

fn invalid(message: &str) -> Result<(), ConfigError> {
    Err(ConfigError::ValidationError(message.to_string()))
}

/// Validate configuration values serde cannot check on its own.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return invalid("server.port cannot be 0");
    }

    let orchestrator = &config.orchestrator;
    if orchestrator.max_parallel_units == 0 {
        return invalid("orchestrator.max_parallel_units must be at least 1");
    }
    if orchestrator.supported_languages.is_empty() {
        return invalid("orchestrator.supported_languages cannot be empty");
    }

    let retry = &config.processor.retry;
    if retry.max_attempts == 0 {
        return invalid("processor.retry.max_attempts must be at least 1");
    }
    if retry.backoff_multiplier < 1.0 {
        return invalid("processor.retry.backoff_multiplier must be >= 1.0");
    }

    if config.progress.subscribe_attempts == 0 {
        return invalid("progress.subscribe_attempts must be at least 1");
    }

    Ok(())
}
