//! Cross-site request forgery guard
//!
//! Stateless: there is no per-session token. A state-changing request is
//! accepted when its `Origin` (or, failing that, `Referer`) is allow-listed
//! and it carries the `X-Requested-With` marker that plain HTML forms cannot
//! set. Requests with neither provenance header come from non-browser tools
//! and are let through unless strict mode is on.

use async_trait::async_trait;
use axum::{
    extract::Request,
    http::{header, HeaderMap, Method},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::chain::{Middleware, Next};
use crate::error::ApiError;
use crate::observability::{SecurityContext, SecurityEvent, SecurityLogger};

/// Header whose presence marks a deliberate scripted request
pub const MARKER_HEADER: &str = "x-requested-with";

/// Allow-list entry that matches every origin
pub const WILDCARD: &str = "*";

/// Origin allow-list and strictness
#[derive(Debug, Clone, Deserialize)]
pub struct CsrfPolicy {
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    /// Reject requests carrying neither `Origin` nor `Referer`
    #[serde(default)]
    pub strict_mode: bool,
}

impl Default for CsrfPolicy {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
            strict_mode: false,
        }
    }
}

pub(crate) fn default_allowed_origins() -> Vec<String> {
    [
        "http://localhost:8080",
        "http://localhost:3000",
        "http://127.0.0.1:8080",
        "http://127.0.0.1:3000",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl CsrfPolicy {
    fn has_wildcard(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == WILDCARD)
    }

    /// Header values are compared as raw bytes. A value that is not valid
    /// text still counts as present and can only match through the wildcard.
    pub fn origin_allowed(&self, origin: &[u8]) -> bool {
        self.has_wildcard() || self.allowed_origins.iter().any(|o| o.as_bytes() == origin)
    }

    /// Referers are full URLs, so they match by prefix
    pub fn referer_allowed(&self, referer: &[u8]) -> bool {
        self.has_wildcard()
            || self
                .allowed_origins
                .iter()
                .any(|o| referer.starts_with(o.as_bytes()))
    }
}

/// GET, HEAD and OPTIONS never change state
pub fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// CSRF rejection reasons
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CsrfError {
    #[error("CSRF validation failed: missing origin/referer")]
    MissingOriginReferer,

    #[error("CSRF validation failed: invalid origin")]
    DisallowedOrigin,

    #[error("CSRF validation failed: invalid referer")]
    DisallowedReferer,

    #[error("CSRF validation failed: missing X-Requested-With header")]
    MissingMarkerHeader,
}

/// Chain stage enforcing a [`CsrfPolicy`]
pub struct CsrfGuard {
    policy: CsrfPolicy,
    security_log: SecurityLogger,
}

impl CsrfGuard {
    pub fn new(policy: CsrfPolicy, security_log: SecurityLogger) -> Self {
        Self {
            policy,
            security_log,
        }
    }

    pub fn policy(&self) -> &CsrfPolicy {
        &self.policy
    }

    /// Decide whether a request may proceed. Empty header values count as
    /// absent.
    pub fn check(
        &self,
        method: &Method,
        origin: Option<&str>,
        referer: Option<&str>,
        marker_present: bool,
    ) -> Result<(), CsrfError> {
        self.check_raw(
            method,
            origin.map(str::as_bytes),
            referer.map(str::as_bytes),
            marker_present,
        )
    }

    fn check_raw(
        &self,
        method: &Method,
        origin: Option<&[u8]>,
        referer: Option<&[u8]>,
        marker_present: bool,
    ) -> Result<(), CsrfError> {
        if is_safe_method(method) {
            return Ok(());
        }

        let origin = origin.filter(|o| !o.is_empty());
        let referer = referer.filter(|r| !r.is_empty());

        match (origin, referer) {
            (None, None) => {
                return if self.policy.strict_mode {
                    Err(CsrfError::MissingOriginReferer)
                } else {
                    Ok(())
                };
            }
            (Some(origin), _) if !self.policy.origin_allowed(origin) => {
                return Err(CsrfError::DisallowedOrigin);
            }
            (None, Some(referer)) if !self.policy.referer_allowed(referer) => {
                return Err(CsrfError::DisallowedReferer);
            }
            _ => {}
        }

        // Either header was present, so this looks browser-originated.
        if !marker_present {
            return Err(CsrfError::MissingMarkerHeader);
        }

        Ok(())
    }

    fn check_headers(&self, method: &Method, headers: &HeaderMap) -> Result<(), CsrfError> {
        let raw = move |name: header::HeaderName| headers.get(name).map(|v| v.as_bytes());
        let marker_present = headers
            .get(MARKER_HEADER)
            .is_some_and(|v| !v.as_bytes().is_empty());

        self.check_raw(
            method,
            raw(header::ORIGIN),
            raw(header::REFERER),
            marker_present,
        )
    }
}

#[async_trait]
impl Middleware for CsrfGuard {
    fn name(&self) -> &'static str {
        "csrf"
    }

    async fn handle(&self, req: Request, next: Next<'_>) -> Response {
        match self.check_headers(req.method(), req.headers()) {
            Ok(()) => next.run(req).await,
            Err(e) => {
                self.security_log.log(
                    SecurityEvent::CsrfBlocked,
                    &SecurityContext::from_request(&req),
                    &e.to_string(),
                );
                ApiError::from(e).into_response()
            }
        }
    }
}
