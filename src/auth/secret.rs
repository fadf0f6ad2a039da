//! Process-wide token signing secret

use secrecy::{ExposeSecret, SecretString, SecretVec};
use tracing::warn;

/// Well-known development secret used when none is configured.
/// Anyone can forge tokens signed with it.
pub const INSECURE_DEFAULT_SECRET: &str = "k6-test-secret-key-CHANGE-IN-PRODUCTION";

/// Where the signing secret came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretSource {
    Configured,
    InsecureDefault,
}

/// HMAC key shared by token issuance and verification
pub struct SigningSecret {
    key: SecretVec<u8>,
    source: SecretSource,
}

impl SigningSecret {
    /// Use the configured secret, or fall back to [`INSECURE_DEFAULT_SECRET`]
    /// with an operator warning.
    pub fn from_config(configured: Option<&SecretString>) -> Self {
        match configured.filter(|secret| !secret.expose_secret().is_empty()) {
            Some(secret) => Self {
                key: SecretVec::new(secret.expose_secret().as_bytes().to_vec()),
                source: SecretSource::Configured,
            },
            None => {
                warn!(
                    "JWT_SECRET is not set; signing tokens with the insecure default secret. \
                     Set JWT_SECRET in production!"
                );
                Self {
                    key: SecretVec::new(INSECURE_DEFAULT_SECRET.as_bytes().to_vec()),
                    source: SecretSource::InsecureDefault,
                }
            }
        }
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            key: SecretVec::new(bytes.into()),
            source: SecretSource::Configured,
        }
    }

    pub fn source(&self) -> SecretSource {
        self.source
    }

    pub fn is_insecure_default(&self) -> bool {
        self.source == SecretSource::InsecureDefault
    }

    pub(crate) fn expose(&self) -> &[u8] {
        self.key.expose_secret()
    }
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningSecret")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}
