//! Request logging stage

use async_trait::async_trait;
use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    response::Response,
};
use std::time::Instant;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use super::chain::{Middleware, Next};

/// Header carrying the per-request id back to the client
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Opens a span per request and logs its outcome
#[derive(Debug, Clone, Default)]
pub struct RequestLogging;

#[async_trait]
impl Middleware for RequestLogging {
    fn name(&self) -> &'static str {
        "logging"
    }

    async fn handle(&self, req: Request, next: Next<'_>) -> Response {
        let request_id = Uuid::new_v4();
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let span = info_span!("request", %request_id, %method, %path);
        let started = Instant::now();

        let mut response = next.run(req).instrument(span.clone()).await;

        let status = response.status();
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        span.in_scope(|| {
            if status.is_server_error() {
                warn!(status = status.as_u16(), latency_ms, "Request completed");
            } else {
                info!(status = status.as_u16(), latency_ms, "Request completed");
            }
        });

        if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
            response
                .headers_mut()
                .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
        }
        response
    }
}
