use crate::config::types::{Config, FetchConfig, OutputConfig, ShardsConfig};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_shards_config(&config.shards)?;
    validate_fetch_config(&config.fetch)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_shards_config(config: &ShardsConfig) -> Result<(), ConfigError> {
    if config.count < 1 {
        return Err(ConfigError::Validation(format!(
            "shards.count must be >= 1, got {}",
            config.count
        )));
    }

    Ok(())
}

/// Validates the per-shard fetch settings on their own
pub fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.max_in_flight < 1 || config.max_in_flight > 1000 {
        return Err(ConfigError::Validation(format!(
            "max-in-flight must be between 1 and 1000, got {}",
            config.max_in_flight
        )));
    }

    if config.per_host_limit < 1 {
        return Err(ConfigError::Validation(format!(
            "per-host-limit must be >= 1, got {}",
            config.per_host_limit
        )));
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "batch-size must be >= 1, got {}",
            config.batch_size
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request-timeout-secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if let Some(path) = &config.database_path {
        if path.is_empty() {
            return Err(ConfigError::Validation(
                "database-path cannot be empty when set".to_string(),
            ));
        }
    }

    if config.drain_interval_ms < 1 {
        return Err(ConfigError::Validation(format!(
            "drain-interval-ms must be >= 1, got {}",
            config.drain_interval_ms
        )));
    }

    Ok(())
}
