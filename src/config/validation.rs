//! Configuration validation

use super::*;
use crate::error::{ApiError, Result};
use crate::observability::LOG_FORMATS;

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_server_config(&config.server)?;
    validate_rate_limit_config(&config.rate_limit)?;
    validate_origin_lists(config)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

/// Validate server configuration
pub fn validate_server_config(config: &ServerConfig) -> Result<()> {
    if config.port == 0 {
        return Err(ApiError::Config("Server port cannot be 0".to_string()));
    }

    if config.host.is_empty() {
        return Err(ApiError::Config("Server host cannot be empty".to_string()));
    }

    Ok(())
}

fn validate_rate_limit_config(config: &RateLimitSettings) -> Result<()> {
    if !config.enabled {
        return Ok(());
    }

    if config.requests == 0 {
        return Err(ApiError::Config(
            "Rate limit requests must be greater than 0".to_string(),
        ));
    }

    if config.window_secs == 0 {
        return Err(ApiError::Config(
            "Rate limit window must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

fn validate_origin_lists(config: &Config) -> Result<()> {
    if config.cors.allowed_origins.is_empty() {
        return Err(ApiError::Config(
            "CORS allowed origins cannot be empty".to_string(),
        ));
    }

    if config.cors.allowed_methods.is_empty() {
        return Err(ApiError::Config(
            "CORS allowed methods cannot be empty".to_string(),
        ));
    }

    if config.csrf.allowed_origins.is_empty() {
        return Err(ApiError::Config(
            "CSRF allowed origins cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging_config(config: &LoggingConfig) -> Result<()> {
    if !LOG_FORMATS.contains(&config.format.as_str()) {
        return Err(ApiError::Config(format!(
            "Unknown log format '{}' (expected one of: {})",
            config.format,
            LOG_FORMATS.join(", ")
        )));
    }

    Ok(())
}
