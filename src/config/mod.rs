//! Configuration management for the API server

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::middleware::{BodyLimitConfig, CorsConfig, CsrfPolicy, RateLimitConfig};

pub mod loader;
pub mod validation;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
    #[serde(default)]
    pub body_limit: BodyLimitSettings,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub csrf: CsrfPolicy,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host
    #[serde(default = "default_server_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_server_port")]
    pub port: u16,
}

impl ServerConfig {
    /// `host:port` listen address
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}

/// Fixed-window rate limit settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Requests allowed per client per window
    #[serde(default = "default_rate_limit_requests")]
    pub requests: usize,

    /// Window length in seconds
    #[serde(default = "default_rate_limit_window")]
    pub window_secs: u64,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            requests: default_rate_limit_requests(),
            window_secs: default_rate_limit_window(),
            enabled: true,
        }
    }
}

/// Request body size settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyLimitSettings {
    /// Maximum request body size in bytes (0 = unlimited)
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

impl Default for BodyLimitSettings {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
        }
    }
}

/// Token signing configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// HMAC signing secret (secured). Falls back to `JWT_SECRET`.
    #[serde(default, deserialize_with = "deserialize_optional_secret")]
    pub jwt_secret: Option<SecretString>,
}

impl AuthConfig {
    pub fn has_secret(&self) -> bool {
        self.jwt_secret
            .as_ref()
            .is_some_and(|s| !s.expose_secret().is_empty())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json, compact or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Emit structured security events
    #[serde(default = "default_true")]
    pub security_events: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            security_events: true,
        }
    }
}

// Default value functions
fn default_server_host() -> String { "0.0.0.0".to_string() }
fn default_server_port() -> u16 { 8080 }
fn default_rate_limit_requests() -> usize { 100 }
fn default_rate_limit_window() -> u64 { 60 }
fn default_max_bytes() -> usize { 1024 * 1024 } // 1 MiB
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }
fn default_true() -> bool { true }

impl Config {
    /// Load configuration from an optional TOML file with environment
    /// variable overrides, then validate it
    pub fn load<P: AsRef<Path>>(path: P) -> crate::error::Result<Self> {
        let config = loader::load_config_with_env(path)?;
        validation::validate_config(&config)?;
        Ok(config)
    }

    /// Validate this configuration
    pub fn validate(&self) -> crate::error::Result<()> {
        validation::validate_config(self)
    }

    /// Create default configuration
    pub fn default_config() -> Self {
        Self::default()
    }

    pub fn to_rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_requests: self.rate_limit.requests,
            window_duration: Duration::from_secs(self.rate_limit.window_secs),
            enabled: self.rate_limit.enabled,
        }
    }

    pub fn to_body_limit_config(&self) -> BodyLimitConfig {
        BodyLimitConfig {
            max_body_size: self.body_limit.max_bytes,
        }
    }
}

/// Custom deserializer for Option<SecretString>
fn deserialize_optional_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.map(SecretString::new))
}
