//! Middleware components for request processing

pub mod auth;
pub mod body_limit;
pub mod chain;
pub mod cors;
pub mod csrf;
pub mod headers;
pub mod logging;
pub mod rate_limiter;
pub mod validator;

pub use auth::{parse_bearer, BearerAuth};
pub use body_limit::{BodyLimitConfig, BodyLimiter};
pub use chain::{ChainBuilder, Middleware, MiddlewareChain, Next};
pub use cors::{Cors, CorsConfig};
pub use csrf::{CsrfError, CsrfGuard, CsrfPolicy};
pub use headers::SecurityHeaders;
pub use logging::RequestLogging;
pub use rate_limiter::{
    client_key, RateLimitConfig, RateLimitError, RateLimitStage, RateLimiter, SweeperHandle,
};
pub use validator::{InputValidator, ValidationError};
