//! API route configuration

use axum::{
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;

use crate::{
    config::Config,
    error::ApiError,
    middleware::{
        BearerAuth, BodyLimiter, Cors, CsrfGuard, Middleware, MiddlewareChain, RateLimitStage,
        RateLimiter, RequestLogging, SecurityHeaders,
    },
};

use super::handlers::{self, AppState};
use super::simulate;

/// Every chain the router runs, outermost first
pub struct Chains {
    /// Runs for every request, matched or not
    pub global: MiddlewareChain,
    /// User CRUD, login and refresh
    pub protected: MiddlewareChain,
    /// Routes that need a bearer token
    pub authenticated: MiddlewareChain,
}

impl Chains {
    pub fn new(state: &AppState, rate_limiter: Arc<RateLimiter>, config: &Config) -> Self {
        let security_log = state.security_log;
        let csrf: Arc<dyn Middleware> = Arc::new(CsrfGuard::new(config.csrf.clone(), security_log));

        let global = MiddlewareChain::builder()
            .stage(RequestLogging)
            .stage(SecurityHeaders)
            .stage(RateLimitStage::new(rate_limiter, security_log))
            .stage(Cors::new(config.cors.clone()))
            .build();

        let protected = MiddlewareChain::builder()
            .stage(BodyLimiter::new(config.to_body_limit_config()))
            .shared(csrf.clone())
            .build();

        // CSRF runs after authentication here, so a request that reaches it
        // already carries a bearer token.
        let authenticated = MiddlewareChain::builder()
            .stage(BearerAuth::new(state.authenticator.clone(), security_log))
            .shared(csrf)
            .build();

        Self {
            global,
            protected,
            authenticated,
        }
    }
}

/// Build the complete API router with middleware
pub fn build_router(state: AppState, rate_limiter: Arc<RateLimiter>, config: &Config) -> Router {
    let chains = Chains::new(&state, rate_limiter, config);

    // Global chain only
    let open_routes = Router::new()
        .route(
            "/health",
            get(handlers::health).fallback(handlers::method_not_allowed),
        )
        .route(
            "/delay/:ms",
            get(simulate::delay).fallback(handlers::method_not_allowed),
        )
        .route(
            "/random-delay",
            get(simulate::random_delay).fallback(handlers::method_not_allowed),
        )
        .route(
            "/error-rate/:pct",
            get(simulate::error_rate).fallback(handlers::method_not_allowed),
        );

    let protected_routes = chains.protected.route_layer(
        Router::new()
            .route(
                "/users",
                get(handlers::list_users)
                    .post(handlers::create_user)
                    .fallback(handlers::method_not_allowed),
            )
            .route(
                "/users/:id",
                get(handlers::get_user)
                    .put(handlers::update_user)
                    .delete(handlers::delete_user)
                    .fallback(handlers::method_not_allowed),
            )
            .route(
                "/auth/login",
                post(handlers::login).fallback(handlers::method_not_allowed),
            )
            .route(
                "/auth/refresh",
                post(handlers::refresh).fallback(handlers::method_not_allowed),
            ),
    );

    let authenticated_routes = chains.authenticated.route_layer(Router::new().route(
        "/auth/me",
        get(handlers::me).fallback(handlers::method_not_allowed),
    ));

    let router = Router::new()
        .merge(open_routes)
        .merge(protected_routes)
        .merge(authenticated_routes)
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response));

    chains.global.layer(router)
}

/// Convert a handler panic into a JSON 500
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");

    ApiError::Internal(format!("handler panicked: {detail}")).into_response()
}
