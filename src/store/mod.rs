//! In-memory user store

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// A stored user record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug)]
struct Inner {
    users: HashMap<i64, User>,
    next_id: i64,
}

/// Keyed user map behind a read/write lock. Ids are assigned monotonically
/// from 1 and never reused.
#[derive(Debug)]
pub struct UserStore {
    inner: RwLock<Inner>,
}

impl UserStore {
    /// Empty store
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                users: HashMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Store pre-populated with the three fixture users
    pub async fn seeded() -> Self {
        let store = Self::new();
        store.create("Alice", "alice@example.com").await;
        store.create("Bob", "bob@example.com").await;
        store.create("Charlie", "charlie@example.com").await;
        store
    }

    /// All users ordered by id
    pub async fn list(&self) -> Vec<User> {
        let inner = self.inner.read().await;
        let mut users: Vec<User> = inner.users.values().cloned().collect();
        users.sort_by_key(|user| user.id);
        users
    }

    pub async fn get(&self, id: i64) -> Option<User> {
        self.inner.read().await.users.get(&id).cloned()
    }

    pub async fn find_by_email(&self, email: &str) -> Option<User> {
        let inner = self.inner.read().await;
        inner
            .users
            .values()
            .filter(|user| user.email == email)
            .min_by_key(|user| user.id)
            .cloned()
    }

    pub async fn create(&self, name: &str, email: &str) -> User {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let user = User {
            id: inner.next_id,
            name: name.to_string(),
            email: email.to_string(),
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(user.id, user.clone());
        inner.next_id += 1;
        debug!(user_id = user.id, "User created");
        user
    }

    pub async fn update(&self, id: i64, name: &str, email: &str) -> Option<User> {
        let mut inner = self.inner.write().await;
        let user = inner.users.get_mut(&id)?;
        user.name = name.to_string();
        user.email = email.to_string();
        user.updated_at = Utc::now();
        Some(user.clone())
    }

    /// Returns `false` if no such user existed
    pub async fn delete(&self, id: i64) -> bool {
        self.inner.write().await.users.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.users.len()
    }
}

impl Default for UserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seeded_store() {
        let store = UserStore::seeded().await;
        let users = store.list().await;

        assert_eq!(users.len(), 3);
        assert_eq!(users[0].id, 1);
        assert_eq!(users[0].email, "alice@example.com");
        assert_eq!(users[2].name, "Charlie");
    }

    #[tokio::test]
    async fn test_ids_are_not_reused() {
        let store = UserStore::new();
        let first = store.create("A", "a@example.com").await;
        assert!(store.delete(first.id).await);

        let second = store.create("B", "b@example.com").await;
        assert_eq!(second.id, first.id + 1);
        assert!(store.get(first.id).await.is_none());
    }

    #[tokio::test]
    async fn test_update_and_missing() {
        let store = UserStore::seeded().await;

        let updated = store.update(2, "Robert", "robert@example.com").await.unwrap();
        assert_eq!(updated.name, "Robert");
        assert!(updated.updated_at >= updated.created_at);

        assert!(store.update(99, "x", "x@example.com").await.is_none());
        assert!(!store.delete(99).await);
    }

    #[tokio::test]
    async fn test_find_by_email() {
        let store = UserStore::seeded().await;
        assert_eq!(store.find_by_email("bob@example.com").await.unwrap().id, 2);
        assert!(store.find_by_email("nobody@example.com").await.is_none());
    }
}
