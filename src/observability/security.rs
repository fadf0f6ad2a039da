//! Structured security event log

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request},
    http::{header::USER_AGENT, request::Parts, Extensions, HeaderMap, Method, Uri},
};
use std::convert::Infallible;
use std::fmt;
use tracing::warn;

use crate::middleware::client_key;

/// Kinds of security-relevant events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEvent {
    AuthSuccess,
    AuthFailure,
    RateLimitHit,
    CsrfBlocked,
    InvalidInput,
    Unauthorized,
}

impl SecurityEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityEvent::AuthSuccess => "AUTH_SUCCESS",
            SecurityEvent::AuthFailure => "AUTH_FAILURE",
            SecurityEvent::RateLimitHit => "RATE_LIMIT_HIT",
            SecurityEvent::CsrfBlocked => "CSRF_BLOCKED",
            SecurityEvent::InvalidInput => "INVALID_INPUT",
            SecurityEvent::Unauthorized => "UNAUTHORIZED",
        }
    }
}

impl fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request attributes recorded with every security event
#[derive(Debug, Clone)]
pub struct SecurityContext {
    pub client: String,
    pub method: Method,
    pub path: String,
    pub user_agent: String,
}

impl SecurityContext {
    fn from_parts(method: &Method, uri: &Uri, headers: &HeaderMap, extensions: &Extensions) -> Self {
        Self {
            client: client_key(headers, extensions),
            method: method.clone(),
            path: uri.path().to_string(),
            user_agent: headers
                .get(USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string(),
        }
    }

    pub fn from_request(req: &Request) -> Self {
        Self::from_parts(req.method(), req.uri(), req.headers(), req.extensions())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for SecurityContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(
            &parts.method,
            &parts.uri,
            &parts.headers,
            &parts.extensions,
        ))
    }
}

/// Emits security events on the `security` tracing target
#[derive(Debug, Clone, Copy)]
pub struct SecurityLogger {
    enabled: bool,
}

impl SecurityLogger {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn log(&self, event: SecurityEvent, ctx: &SecurityContext, details: &str) {
        if !self.enabled {
            return;
        }

        warn!(
            target: "security",
            event = event.as_str(),
            ip = %ctx.client,
            method = %ctx.method,
            path = %ctx.path,
            user_agent = %ctx.user_agent,
            details,
            "Security event"
        );
    }
}

impl Default for SecurityLogger {
    fn default() -> Self {
        Self::new(true)
    }
}
