//! Configuration loader with environment variable support

use super::Config;
use crate::error::Result;
use config::{Environment, File, FileFormat};
use secrecy::SecretString;
use std::path::Path;
use tracing::debug;

/// Environment variable prefix, e.g. `PRACTICE_API__SERVER__PORT=9090`
pub const ENV_PREFIX: &str = "PRACTICE_API";

/// Environment variable read when no signing secret is configured
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";

/// Load configuration from an optional TOML file with environment variable
/// overrides. A missing file yields the defaults.
pub fn load_config_with_env<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    debug!("Loading configuration from {}", path.display());

    let config = config::Config::builder()
        .add_source(
            File::from(path)
                .format(FileFormat::Toml)
                .required(false),
        )
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("cors.allowed_origins")
                .with_list_parse_key("cors.allowed_methods")
                .with_list_parse_key("cors.allowed_headers")
                .with_list_parse_key("csrf.allowed_origins")
                .try_parsing(true),
        )
        .build()?;

    let mut cfg: Config = config.try_deserialize()?;
    apply_secret_fallback(&mut cfg, std::env::var(JWT_SECRET_ENV).ok());
    Ok(cfg)
}

/// Parse configuration from TOML text without consulting the environment
pub fn load_config_from_str(toml: &str) -> Result<Config> {
    let config = config::Config::builder()
        .add_source(File::from_str(toml, FileFormat::Toml))
        .build()?;

    Ok(config.try_deserialize()?)
}

fn apply_secret_fallback(cfg: &mut Config, env_secret: Option<String>) {
    if cfg.auth.has_secret() {
        return;
    }

    if let Some(secret) = env_secret.filter(|s| !s.is_empty()) {
        cfg.auth.jwt_secret = Some(SecretString::new(secret));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_empty_document_yields_defaults() {
        let cfg = load_config_from_str("").unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.rate_limit.requests, 100);
        assert_eq!(cfg.rate_limit.window_secs, 60);
        assert_eq!(cfg.body_limit.max_bytes, 1024 * 1024);
        assert!(!cfg.csrf.strict_mode);
        assert_eq!(cfg.csrf.allowed_origins.len(), 4);
        assert!(cfg.auth.jwt_secret.is_none());
    }

    #[test]
    fn test_sections_override_defaults() {
        let cfg = load_config_from_str(
            r#"
            [server]
            port = 9090

            [rate_limit]
            requests = 5
            window_secs = 10

            [csrf]
            allowed_origins = ["*"]
            strict_mode = true

            [auth]
            jwt_secret = "s3cret"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.server.addr(), "0.0.0.0:9090");
        assert_eq!(cfg.to_rate_limit_config().max_requests, 5);
        assert_eq!(cfg.csrf.allowed_origins, vec!["*".to_string()]);
        assert!(cfg.csrf.strict_mode);
        assert_eq!(
            cfg.auth.jwt_secret.as_ref().map(|s| s.expose_secret().as_str()),
            Some("s3cret")
        );
    }

    #[test]
    fn test_secret_fallback_only_when_unset() {
        let mut cfg = Config::default_config();
        apply_secret_fallback(&mut cfg, Some("from-env".to_string()));
        assert_eq!(
            cfg.auth.jwt_secret.as_ref().map(|s| s.expose_secret().as_str()),
            Some("from-env")
        );

        apply_secret_fallback(&mut cfg, Some("other".to_string()));
        assert_eq!(
            cfg.auth.jwt_secret.as_ref().map(|s| s.expose_secret().as_str()),
            Some("from-env")
        );

        let mut cfg = Config::default_config();
        apply_secret_fallback(&mut cfg, Some(String::new()));
        assert!(!cfg.auth.has_secret());
    }
}
