//! Credential verification for login

use async_trait::async_trait;
use std::sync::Arc;

use crate::store::UserStore;

/// The identity a login resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub user_id: i64,
    pub email: String,
}

/// Matches an email/password pair to a subject.
///
/// Returns `None` for unknown users and wrong passwords alike.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify_credentials(&self, email: &str, password: &str) -> Option<Subject>;
}

/// Test-fixture verifier: any user in the store, one shared password.
///
/// This is a load-testing stand-in, not credential storage.
pub struct FixedPasswordVerifier {
    store: Arc<UserStore>,
    password: String,
}

impl FixedPasswordVerifier {
    pub const DEFAULT_PASSWORD: &'static str = "password";

    pub fn new(store: Arc<UserStore>) -> Self {
        Self::with_password(store, Self::DEFAULT_PASSWORD)
    }

    pub fn with_password(store: Arc<UserStore>, password: impl Into<String>) -> Self {
        Self {
            store,
            password: password.into(),
        }
    }
}

#[async_trait]
impl CredentialVerifier for FixedPasswordVerifier {
    async fn verify_credentials(&self, email: &str, password: &str) -> Option<Subject> {
        if password != self.password {
            return None;
        }

        self.store.find_by_email(email).await.map(|user| Subject {
            user_id: user.id,
            email: user.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_password_verifier() {
        let store = Arc::new(UserStore::seeded().await);
        let verifier = FixedPasswordVerifier::new(store);

        let subject = verifier
            .verify_credentials("alice@example.com", "password")
            .await
            .unwrap();
        assert_eq!(subject.user_id, 1);

        assert!(verifier.verify_credentials("alice@example.com", "wrong").await.is_none());
        assert!(verifier.verify_credentials("ghost@example.com", "password").await.is_none());
    }
}
