//! HTTP server assembly and lifecycle

use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::api::{build_router, AppState};
use crate::auth::{FixedPasswordVerifier, SigningSecret, TokenAuthenticator};
use crate::config::Config;
use crate::error::Result;
use crate::middleware::RateLimiter;
use crate::observability::SecurityLogger;
use crate::shutdown::ShutdownNotifier;
use crate::store::UserStore;

/// Owns every long-lived component. Built once at startup.
pub struct Server {
    config: Config,
    state: AppState,
    rate_limiter: Arc<RateLimiter>,
}

impl Server {
    /// Validate `config` and build the store, authenticator and rate limiter
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let store = Arc::new(UserStore::seeded().await);
        info!("User store seeded with {} users", store.len().await);

        let secret = SigningSecret::from_config(config.auth.jwt_secret.as_ref());
        if secret.is_insecure_default() {
            warn!("Tokens can be forged by anyone who knows the default secret");
        }

        let authenticator = Arc::new(TokenAuthenticator::new(
            secret,
            Arc::new(FixedPasswordVerifier::new(store.clone())),
        ));

        let rate_limiter = Arc::new(RateLimiter::new(config.to_rate_limit_config()));
        info!(
            requests = config.rate_limit.requests,
            window_secs = config.rate_limit.window_secs,
            enabled = config.rate_limit.enabled,
            "Rate limiter initialized"
        );

        let state = AppState {
            store,
            authenticator,
            security_log: SecurityLogger::new(config.logging.security_events),
        };

        Ok(Self {
            config,
            state,
            rate_limiter,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    /// Full router with every chain attached
    pub fn router(&self) -> Router {
        build_router(self.state.clone(), self.rate_limiter.clone(), &self.config)
    }

    /// Bind the configured address and serve until `shutdown` fires
    pub async fn run(self, shutdown: ShutdownNotifier) -> Result<()> {
        let addr = self.config.server.addr();
        let listener = TcpListener::bind(&addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` fires
    pub async fn serve(self, listener: TcpListener, shutdown: ShutdownNotifier) -> Result<()> {
        let sweeper = self.rate_limiter.start_sweeper();
        let app = self.router();

        info!("Server listening on {}", listener.local_addr()?);

        let served = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await;

        sweeper.stop().await;
        info!("Rate limiter sweeper stopped");

        served?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shutdown::ShutdownCoordinator;

    #[tokio::test]
    async fn test_new_rejects_invalid_config() {
        let mut config = Config::default_config();
        config.rate_limit.requests = 0;
        assert!(Server::new(config).await.is_err());
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let server = Server::new(Config::default_config()).await.unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let coordinator = ShutdownCoordinator::new();

        let handle = tokio::spawn(server.serve(listener, coordinator.subscribe()));
        coordinator.shutdown();

        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_disabled_rate_limit_with_zero_window_serves() {
        let mut config = Config::default_config();
        config.rate_limit.enabled = false;
        config.rate_limit.window_secs = 0;

        let server = Server::new(config).await.unwrap();
        let sweeper = server.rate_limiter().start_sweeper();
        assert!(!sweeper.is_running());
        sweeper.stop().await;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let coordinator = ShutdownCoordinator::new();
        let handle = tokio::spawn(server.serve(listener, coordinator.subscribe()));
        coordinator.shutdown();

        handle.await.unwrap().unwrap();
    }
}
