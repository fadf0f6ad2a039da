//! Fixed-window rate limiting keyed by client address

use async_trait::async_trait;
use axum::{
    extract::{ConnectInfo, Request},
    http::{Extensions, HeaderMap},
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::chain::{Middleware, Next};
use crate::error::ApiError;
use crate::observability::{SecurityContext, SecurityEvent, SecurityLogger};

/// Rate limit configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window
    pub max_requests: usize,
    /// Time window duration
    pub window_duration: Duration,
    /// Whether to enable rate limiting
    pub enabled: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_duration: Duration::from_secs(60),
            enabled: true,
        }
    }
}

/// Per-client counter for the current window
#[derive(Debug, Clone)]
struct WindowCounter {
    count: usize,
    window_start: Instant,
}

/// Fixed-window rate limiter.
///
/// All counters live behind one exclusive lock. Every `allow` call and every
/// sweep serialise on it, so under concurrent load this lock is the throughput
/// ceiling of the whole pipeline. The critical section is a single map lookup
/// plus an increment.
pub struct RateLimiter {
    config: RateLimitConfig,
    records: Mutex<HashMap<String, WindowCounter>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            records: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    fn records(&self) -> MutexGuard<'_, HashMap<String, WindowCounter>> {
        // A panic while holding the lock cannot leave a counter half-written,
        // so a poisoned table is still consistent.
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record a request from `client_key` and report whether it is admitted.
    pub fn allow(&self, client_key: &str) -> bool {
        if !self.config.enabled {
            return true;
        }

        let now = Instant::now();
        let mut records = self.records();

        let Some(record) = records.get_mut(client_key) else {
            records.insert(
                client_key.to_string(),
                WindowCounter {
                    count: 1,
                    window_start: now,
                },
            );
            return true;
        };

        if now.duration_since(record.window_start) > self.config.window_duration {
            record.count = 1;
            record.window_start = now;
            return true;
        }

        if record.count >= self.config.max_requests {
            return false;
        }

        record.count += 1;
        true
    }

    /// Like [`allow`](Self::allow), but reports a denial as an error carrying
    /// the retry hint.
    pub fn check_rate_limit(&self, client_key: &str) -> Result<(), RateLimitError> {
        if self.allow(client_key) {
            debug!(client = %client_key, "Request allowed");
            Ok(())
        } else {
            Err(RateLimitError::LimitExceeded {
                retry_after: self.config.window_duration,
                limit: self.config.max_requests,
            })
        }
    }

    /// Current count for a client, if it has a live entry
    pub fn usage(&self, client_key: &str) -> Option<usize> {
        self.records().get(client_key).map(|record| record.count)
    }

    /// Number of tracked clients
    pub fn tracked_clients(&self) -> usize {
        self.records().len()
    }

    /// Drop every entry whose window elapsed. Returns the number removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let window = self.config.window_duration;
        let mut records = self.records();
        let before = records.len();

        records.retain(|_, record| now.duration_since(record.window_start) <= window);

        let removed = before - records.len();
        if removed > 0 {
            debug!(removed, remaining = records.len(), "Swept expired rate limit records");
        }
        removed
    }

    /// Start the periodic sweep. The task runs every window until the
    /// returned handle is stopped or dropped.
    ///
    /// A disabled limiter never records anything, so it gets an idle handle
    /// and no task. The same goes for a zero window, which has no period to
    /// tick on.
    pub fn start_sweeper(self: &Arc<Self>) -> SweeperHandle {
        let period = self.config.window_duration;
        if !self.config.enabled || period.is_zero() {
            debug!("Rate limit sweeper not started");
            return SweeperHandle {
                stop_tx: None,
                task: None,
            };
        }

        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let limiter = Arc::clone(self);

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = interval.tick() => {
                        limiter.sweep();
                    }
                }
            }
            debug!("Rate limit sweeper stopped");
        });

        SweeperHandle {
            stop_tx: Some(stop_tx),
            task: Some(task),
        }
    }
}

/// Owns the background sweep task of a [`RateLimiter`]
pub struct SweeperHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Stop the sweep task and wait for it to exit
    pub async fn stop(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Rate limit sweeper exited abnormally: {}", e);
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        // Dropping the sender wakes the task with a closed channel.
        self.stop_tx.take();
    }
}

/// Rate limit error
#[derive(Debug, Clone, thiserror::Error)]
pub enum RateLimitError {
    #[error("rate limit exceeded")]
    LimitExceeded { retry_after: Duration, limit: usize },
}

/// Derive the rate-limit key for a request: `X-Forwarded-For`, then
/// `X-Real-IP`, then the peer address.
pub fn client_key(headers: &HeaderMap, extensions: &Extensions) -> String {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    header_value("x-forwarded-for")
        .or_else(|| header_value("x-real-ip"))
        .or_else(|| {
            extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Chain stage that rejects clients over their request budget
pub struct RateLimitStage {
    limiter: Arc<RateLimiter>,
    security_log: SecurityLogger,
}

impl RateLimitStage {
    pub fn new(limiter: Arc<RateLimiter>, security_log: SecurityLogger) -> Self {
        Self {
            limiter,
            security_log,
        }
    }
}

#[async_trait]
impl Middleware for RateLimitStage {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    async fn handle(&self, req: Request, next: Next<'_>) -> Response {
        let key = client_key(req.headers(), req.extensions());

        match self.limiter.check_rate_limit(&key) {
            Ok(()) => next.run(req).await,
            Err(e) => {
                warn!(client = %key, limit = self.limiter.config().max_requests, "Rate limit exceeded");
                self.security_log.log(
                    SecurityEvent::RateLimitHit,
                    &SecurityContext::from_request(&req),
                    "rate limit exceeded",
                );
                ApiError::from(e).into_response()
            }
        }
    }
}
