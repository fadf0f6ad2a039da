//! Token claims and the typed request identity

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

/// Identity payload bound into a signed token.
///
/// Timestamps are whole seconds since the Unix epoch (`iat`/`exp`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user_id: i64,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

impl TokenClaims {
    pub fn new(user_id: i64, email: impl Into<String>, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            user_id,
            email: email.into(),
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
        }
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.iat, 0).single()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }

    /// A token is expired from the instant `now` reaches `exp`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }

    /// Lifetime in seconds
    pub fn ttl_secs(&self) -> i64 {
        self.exp - self.iat
    }
}

/// Who the current request is acting as.
///
/// The bearer-auth stage stores `Authenticated` in the request extensions;
/// routes that never pass through it see `Anonymous`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Identity {
    Authenticated(TokenClaims),
    #[default]
    Anonymous,
}

impl Identity {
    pub fn claims(&self) -> Option<&TokenClaims> {
        match self {
            Identity::Authenticated(claims) => Some(claims),
            Identity::Anonymous => None,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Identity>().cloned().unwrap_or_default())
    }
}
