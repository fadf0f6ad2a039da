//! Practice API Server Binary
//!
//! Loads configuration, initializes logging and serves the API until Ctrl+C
//! or SIGTERM.

use anyhow::Context;
use practice_api::{
    config::Config, observability::init_observability, server::Server,
    shutdown::ShutdownCoordinator,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load configuration from {}", config_path))?;

    init_observability(&config.logging.level, &config.logging.format);

    info!("Starting Practice API server");
    info!("Configuration loaded and validated from {}", config_path);

    let server = Server::new(config)
        .await
        .context("failed to initialize server")?;

    let coordinator = Arc::new(ShutdownCoordinator::new());
    let notifier = coordinator.subscribe();
    let signals = coordinator.clone();
    tokio::spawn(async move { signals.wait_for_signal().await });

    server.run(notifier).await.context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}
