//! Bearer token authentication stage

use async_trait::async_trait;
use axum::{
    extract::Request,
    http::header::AUTHORIZATION,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;

use super::chain::{Middleware, Next};
use crate::auth::{AuthError, Identity, TokenAuthenticator, TokenClaims};
use crate::error::ApiError;
use crate::observability::{SecurityContext, SecurityEvent, SecurityLogger};

/// Rejects requests without a valid `Authorization: Bearer <token>` header and
/// attaches [`Identity::Authenticated`] to the ones that pass.
pub struct BearerAuth {
    authenticator: Arc<TokenAuthenticator>,
    security_log: SecurityLogger,
}

impl BearerAuth {
    pub fn new(authenticator: Arc<TokenAuthenticator>, security_log: SecurityLogger) -> Self {
        Self {
            authenticator,
            security_log,
        }
    }

    fn authenticate(&self, req: &Request) -> Result<TokenClaims, AuthError> {
        let header = req
            .headers()
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingHeader)?;
        let token = parse_bearer(header.to_str().map_err(|_| AuthError::MalformedHeader)?)?;
        self.authenticator.verify(token)
    }
}

/// Extract the token from a `Bearer <token>` header value.
///
/// The value must be exactly two space-separated parts with the literal
/// scheme `Bearer`.
pub fn parse_bearer(value: &str) -> Result<&str, AuthError> {
    if value.is_empty() {
        return Err(AuthError::MissingHeader);
    }

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(AuthError::MalformedHeader),
    }
}

#[async_trait]
impl Middleware for BearerAuth {
    fn name(&self) -> &'static str {
        "bearer_auth"
    }

    async fn handle(&self, mut req: Request, next: Next<'_>) -> Response {
        match self.authenticate(&req) {
            Ok(claims) => {
                debug!(user_id = claims.user_id, "Request authenticated");
                req.extensions_mut().insert(Identity::Authenticated(claims));
                next.run(req).await
            }
            Err(e) => {
                let event = match e {
                    AuthError::MissingHeader | AuthError::MalformedHeader => {
                        SecurityEvent::Unauthorized
                    }
                    _ => SecurityEvent::AuthFailure,
                };
                self.security_log
                    .log(event, &SecurityContext::from_request(&req), &e.to_string());
                ApiError::from(e).into_response()
            }
        }
    }
}
