//! In-memory store, used when no database is configured and in tests

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{OutstandingToken, TokenStore, UserStore};
use crate::auth::models::User;
use crate::error::{Error, Result};

#[derive(Default)]
struct Tokens {
    outstanding: HashMap<String, OutstandingToken>,
    blacklisted: HashMap<String, DateTime<Utc>>,
}

impl Tokens {
    /// Drop tokens past their expiry along with their blacklist entries
    fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let expired: Vec<String> = self
            .outstanding
            .values()
            .filter(|token| token.expires_at < now)
            .map(|token| token.jti.clone())
            .collect();
        for jti in &expired {
            self.outstanding.remove(jti);
            self.blacklisted.remove(jti);
        }
        expired.len()
    }
}

/// Users and tokens kept in process memory; clones share the same data
#[derive(Clone, Default)]
pub struct MemoryStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
    tokens: Arc<RwLock<Tokens>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn outstanding_count(&self) -> usize {
        self.tokens.read().await.outstanding.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: User) -> Result<User> {
        let mut users = self.users.write().await;
        if users.values().any(|existing| existing.username == user.username) {
            return Err(Error::UsernameTaken);
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            user.last_login = Some(at);
        }
        Ok(())
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn record_outstanding(&self, token: OutstandingToken) -> Result<()> {
        let mut tokens = self.tokens.write().await;
        let pruned = tokens.prune(Utc::now());
        if pruned > 0 {
            tracing::debug!(count = pruned, "Pruned expired tokens");
        }
        tokens.outstanding.entry(token.jti.clone()).or_insert(token);
        Ok(())
    }

    async fn blacklist(&self, token: OutstandingToken) -> Result<bool> {
        let mut tokens = self.tokens.write().await;
        let jti = token.jti.clone();
        tokens.outstanding.entry(jti.clone()).or_insert(token);
        if tokens.blacklisted.contains_key(&jti) {
            return Ok(false);
        }
        tokens.blacklisted.insert(jti, Utc::now());
        Ok(true)
    }

    async fn is_blacklisted(&self, jti: &str) -> Result<bool> {
        Ok(self.tokens.read().await.blacklisted.contains_key(jti))
    }

    async fn flush_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        Ok(self.tokens.write().await.prune(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::UserRole;
    use chrono::Duration;

    fn token(jti: &str, expires_at: DateTime<Utc>) -> OutstandingToken {
        OutstandingToken {
            jti: jti.to_string(),
            user_id: Uuid::new_v4(),
            token: format!("token-{}", jti),
            created_at: Utc::now(),
            expires_at,
        }
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let store = MemoryStore::new();
        let first = User::new("bob".to_string(), "h".to_string(), UserRole::Operator);
        let second = User::new("bob".to_string(), "h".to_string(), UserRole::Dispatcher);

        store.create_user(first.clone()).await.unwrap();
        assert!(matches!(store.create_user(second).await, Err(Error::UsernameTaken)));
        assert_eq!(store.user_count().await, 1);

        let found = store.find_by_username("bob").await.unwrap().unwrap();
        assert_eq!(found.id, first.id);
        assert_eq!(found.role, UserRole::Operator);
    }

    #[tokio::test]
    async fn test_list_is_sorted() {
        let store = MemoryStore::new();
        for name in ["zed", "amy", "kim"] {
            store
                .create_user(User::new(name.to_string(), "h".to_string(), UserRole::Operator))
                .await
                .unwrap();
        }
        let names: Vec<String> = store
            .list_users()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, vec!["amy", "kim", "zed"]);
    }

    #[tokio::test]
    async fn test_record_login() {
        let store = MemoryStore::new();
        let user = store
            .create_user(User::new("amy".to_string(), "h".to_string(), UserRole::Operator))
            .await
            .unwrap();
        let at = Utc::now();
        store.record_login(user.id, at).await.unwrap();

        let found = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(found.last_login, Some(at));
    }

    #[tokio::test]
    async fn test_blacklist_is_idempotent() {
        let store = MemoryStore::new();
        let entry = token("a1", Utc::now() + Duration::hours(1));

        assert!(!store.is_blacklisted("a1").await.unwrap());
        assert!(store.blacklist(entry.clone()).await.unwrap());
        assert!(!store.blacklist(entry).await.unwrap());
        assert!(store.is_blacklisted("a1").await.unwrap());
        assert_eq!(store.outstanding_count().await, 1);
    }

    #[tokio::test]
    async fn test_flush_expired() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.record_outstanding(token("live", now + Duration::hours(1))).await.unwrap();
        store.blacklist(token("dead", now - Duration::hours(1))).await.unwrap();

        assert_eq!(store.flush_expired(now).await.unwrap(), 1);
        assert_eq!(store.outstanding_count().await, 1);
        assert!(!store.is_blacklisted("dead").await.unwrap());
    }

    #[tokio::test]
    async fn test_recording_prunes_expired_tokens() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.blacklist(token("old", now - Duration::minutes(5))).await.unwrap();
        assert_eq!(store.outstanding_count().await, 1);

        store.record_outstanding(token("new", now + Duration::hours(1))).await.unwrap();
        assert_eq!(store.outstanding_count().await, 1);
        assert!(!store.is_blacklisted("old").await.unwrap());
    }
}
