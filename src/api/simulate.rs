//! Latency and failure simulation endpoints for load testing

use axum::{extract::Path, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::error::Result;
use crate::middleware::ValidationError;

const MAX_DELAY_MS: u64 = 10_000;
const MAX_RANDOM_DELAY_MS: u64 = 1_000;
const MAX_ERROR_RATE: u32 = 100;

#[derive(Debug, Serialize)]
pub struct DelayResponse {
    pub delay_ms: u64,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ErrorRateResponse {
    pub success: bool,
    pub error_rate_percent: u32,
    pub random_value: u32,
    pub time: DateTime<Utc>,
}

fn parse_bounded<T>(raw: &str, max: T, message: &'static str) -> Result<T>
where
    T: std::str::FromStr + PartialOrd,
{
    match raw.parse::<T>() {
        Ok(value) if value <= max => Ok(value),
        _ => Err(ValidationError::OutOfRange(message).into()),
    }
}

async fn sleep_and_report(delay_ms: u64) -> Json<DelayResponse> {
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    Json(DelayResponse {
        delay_ms,
        time: Utc::now(),
    })
}

/// Hold the request for the given number of milliseconds
pub async fn delay(Path(ms): Path<String>) -> Result<Json<DelayResponse>> {
    let delay_ms = parse_bounded(&ms, MAX_DELAY_MS, "invalid delay value (0-10000ms)")?;
    Ok(sleep_and_report(delay_ms).await)
}

/// Hold the request for a uniformly random 0-1000 ms
pub async fn random_delay() -> Json<DelayResponse> {
    let delay_ms = rand::thread_rng().gen_range(0..=MAX_RANDOM_DELAY_MS);
    sleep_and_report(delay_ms).await
}

/// Fail with 500 for roughly `pct` percent of requests
pub async fn error_rate(Path(pct): Path<String>) -> Result<impl IntoResponse> {
    let percent = parse_bounded(&pct, MAX_ERROR_RATE, "invalid error rate (0-100)")?;
    let random_value = rand::thread_rng().gen_range(0..100);
    let should_error = random_value < percent;
    debug!(percent, random_value, should_error, "Error-rate draw");

    let status = if should_error {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(ErrorRateResponse {
            success: !should_error,
            error_rate_percent: percent,
            random_value,
            time: Utc::now(),
        }),
    ))
}
