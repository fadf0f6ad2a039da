//! Observability module for logging and security events

pub mod security;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use security::{SecurityContext, SecurityEvent, SecurityLogger};

/// Supported log output formats
pub const LOG_FORMATS: &[&str] = &["json", "compact", "pretty"];

/// Initialize logging and tracing.
///
/// `RUST_LOG` takes precedence over `log_level` when set.
pub fn init_observability(log_level: &str, format: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_target(true))
                .init();
        }
        "compact" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().compact().with_thread_ids(true))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_thread_ids(true))
                .init();
        }
    }
}
