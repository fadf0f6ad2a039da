//! Practice API - a small HTTP service with a hardened request pipeline
//!
//! Built as a target for load and security testing. Every request walks an
//! ordered middleware chain before reaching its handler.
//!
//! ## Features
//!
//! - **Rate Limiting**: Fixed-window counters per client with a periodic sweep
//! - **Authentication**: HMAC-signed access and refresh tokens
//! - **CSRF Protection**: Origin/Referer allow-lists plus a marker header
//! - **Input Validation**: Sanitization and field validation for user records
//! - **Observability**: Structured request and security event logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use practice_api::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load("config.toml")?;
//!     let server = Server::new(config).await?;
//!
//!     let shutdown = ShutdownCoordinator::new();
//!     server.run(shutdown.subscribe()).await
//! }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
pub mod server;
pub mod shutdown;
pub mod store;

pub use config::Config;
pub use error::{ApiError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::auth::{Identity, TokenAuthenticator, TokenClaims, TokenPair};
    pub use crate::config::Config;
    pub use crate::error::{ApiError, Result};
    pub use crate::middleware::{
        CsrfGuard, CsrfPolicy, InputValidator, Middleware, MiddlewareChain, RateLimitConfig,
        RateLimiter,
    };
    pub use crate::observability::{SecurityEvent, SecurityLogger};
    pub use crate::server::Server;
    pub use crate::shutdown::ShutdownCoordinator;
    pub use crate::store::{User, UserStore};
}
