//! Hardening response headers

use async_trait::async_trait;
use axum::{
    extract::Request,
    http::{header, HeaderName, HeaderValue},
    response::Response,
};

use super::chain::{Middleware, Next};

const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("x-xss-protection", "1; mode=block"),
    ("x-frame-options", "DENY"),
    ("x-content-type-options", "nosniff"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    (
        "content-security-policy",
        "default-src 'self'; frame-ancestors 'none'",
    ),
    ("cache-control", "no-store, no-cache, must-revalidate, private"),
    ("pragma", "no-cache"),
    ("permissions-policy", "geolocation=(), microphone=(), camera=()"),
];

/// Sets the fixed security header set on every response, including
/// rejections produced further down the chain.
#[derive(Debug, Clone, Default)]
pub struct SecurityHeaders;

#[async_trait]
impl Middleware for SecurityHeaders {
    fn name(&self) -> &'static str {
        "security_headers"
    }

    async fn handle(&self, req: Request, next: Next<'_>) -> Response {
        let mut response = next.run(req).await;
        let headers = response.headers_mut();

        for &(name, value) in SECURITY_HEADERS {
            headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
        }
        headers.remove(header::SERVER);
        headers.remove(HeaderName::from_static("x-powered-by"));

        response
    }
}
