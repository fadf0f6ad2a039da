//! Bearer token issuance and verification
//!
//! Tokens are HS256-signed JWTs carrying [`TokenClaims`]. Every login or
//! refresh issues an access token (15 minutes) and a refresh token (24 hours)
//! for the same subject.
//!
//! Two properties are carried deliberately:
//! - access and refresh tokens have the same shape, so `refresh` accepts
//!   either kind as long as it is validly signed and unexpired;
//! - there is no revocation; a token stays usable until `exp`.

pub mod claims;
pub mod credentials;
pub mod secret;
pub mod token;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

pub use claims::{Identity, TokenClaims};
pub use credentials::{CredentialVerifier, FixedPasswordVerifier, Subject};
pub use secret::{SecretSource, SigningSecret, INSECURE_DEFAULT_SECRET};

/// Access token lifetime
pub const ACCESS_TOKEN_TTL_SECS: i64 = 15 * 60;
/// Refresh token lifetime
pub const REFRESH_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

/// Tokens returned by login and refresh
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Issues and verifies signed, time-bounded identity tokens
pub struct TokenAuthenticator {
    secret: SigningSecret,
    credentials: Arc<dyn CredentialVerifier>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenAuthenticator {
    pub fn new(secret: SigningSecret, credentials: Arc<dyn CredentialVerifier>) -> Self {
        Self {
            secret,
            credentials,
            access_ttl: Duration::seconds(ACCESS_TOKEN_TTL_SECS),
            refresh_ttl: Duration::seconds(REFRESH_TOKEN_TTL_SECS),
        }
    }

    pub fn secret_source(&self) -> SecretSource {
        self.secret.source()
    }

    /// Issue an access/refresh pair for a subject
    pub fn issue_pair(&self, user_id: i64, email: &str) -> Result<TokenPair, AuthError> {
        self.issue_pair_at(user_id, email, Utc::now())
    }

    /// Issue a pair as if the current time were `now`
    pub fn issue_pair_at(
        &self,
        user_id: i64,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, AuthError> {
        let access = TokenClaims::new(user_id, email, now, self.access_ttl);
        let refresh = TokenClaims::new(user_id, email, now, self.refresh_ttl);

        Ok(TokenPair {
            access_token: token::encode(&access, &self.secret)?,
            refresh_token: token::encode(&refresh, &self.secret)?,
            expires_in: self.access_ttl.num_seconds(),
        })
    }

    /// Check a token's structure, expiry and signature
    pub fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify as if the current time were `now`.
    ///
    /// Expiry is checked before the signature, so an expired token reports
    /// `Expired` whatever its signature.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, AuthError> {
        let claims = token::decode_unverified(token)?;
        if claims.is_expired_at(now) {
            return Err(AuthError::Expired);
        }
        token::decode_verified(token, &self.secret)
    }

    /// Exchange any valid token for a fresh pair bound to the same subject
    pub fn refresh(&self, token: &str) -> Result<TokenPair, AuthError> {
        self.refresh_at(token, Utc::now())
    }

    pub fn refresh_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenPair, AuthError> {
        let claims = self.verify_at(token, now)?;
        debug!(user_id = claims.user_id, "Refreshing token pair");
        self.issue_pair_at(claims.user_id, &claims.email, now)
    }

    /// Resolve credentials through the verifier and issue a pair
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, AuthError> {
        let subject = self
            .credentials
            .verify_credentials(email, password)
            .await
            .ok_or(AuthError::InvalidCredentials)?;

        self.issue_pair(subject.user_id, &subject.email)
    }
}

/// Authentication errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("missing authorization header")]
    MissingHeader,

    #[error("invalid authorization header format")]
    MalformedHeader,

    #[error("malformed token")]
    Malformed,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid refresh token")]
    InvalidRefreshToken,

    #[error("unauthorized")]
    Unauthenticated,

    #[error("failed to generate token: {0}")]
    TokenIssue(String),
}
