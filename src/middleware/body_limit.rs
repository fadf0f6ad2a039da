//! Middleware for limiting request body size

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::Request,
    http::header::CONTENT_LENGTH,
    response::{IntoResponse, Response},
};
use http_body_util::Limited;
use serde::Deserialize;
use tracing::warn;

use super::chain::{Middleware, Next};
use crate::error::ApiError;

/// Configuration for body size limiting
#[derive(Debug, Clone, Deserialize)]
pub struct BodyLimitConfig {
    /// Maximum body size in bytes (0 = unlimited)
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

fn default_max_body_size() -> usize {
    1024 * 1024 // 1 MiB
}

impl Default for BodyLimitConfig {
    fn default() -> Self {
        Self {
            max_body_size: default_max_body_size(),
        }
    }
}

/// Body size limiting stage.
///
/// A declared `Content-Length` over the limit is rejected up front. Bodies
/// without one are capped while streaming, and extractors report the overflow
/// as 413.
#[derive(Debug, Clone)]
pub struct BodyLimiter {
    config: BodyLimitConfig,
}

impl BodyLimiter {
    /// Create a new body limiter
    pub fn new(config: BodyLimitConfig) -> Self {
        Self { config }
    }

    /// Get the maximum body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.config.max_body_size
    }

    fn declared_length(req: &Request) -> Option<usize> {
        req.headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<usize>().ok())
    }
}

#[async_trait]
impl Middleware for BodyLimiter {
    fn name(&self) -> &'static str {
        "body_limit"
    }

    async fn handle(&self, req: Request, next: Next<'_>) -> Response {
        let max = self.config.max_body_size;
        if max == 0 {
            return next.run(req).await;
        }

        if let Some(len) = Self::declared_length(&req) {
            if len > max {
                warn!("Request body too large: {} bytes (max: {})", len, max);
                return ApiError::PayloadTooLarge.into_response();
            }
        }

        let req = req.map(|body| Body::new(Limited::new(body, max)));
        next.run(req).await
    }
}
