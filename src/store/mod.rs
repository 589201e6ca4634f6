//! Persistence for users and the refresh token registry

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::jwt::Claims;
use crate::auth::models::User;
use crate::error::Result;

/// A refresh token the service has handed out
#[derive(Debug, Clone, PartialEq)]
pub struct OutstandingToken {
    pub jti: String,
    pub user_id: Uuid,
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl OutstandingToken {
    pub fn new(claims: &Claims, token: &str) -> Self {
        Self {
            jti: claims.jti.clone(),
            user_id: claims.user_id,
            token: token.to_string(),
            created_at: claims.issued_at(),
            expires_at: claims.expires_at(),
        }
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persist a user. Fails with `Error::UsernameTaken` when the name is in use,
    /// leaving the store untouched.
    async fn create_user(&self, user: User) -> Result<User>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// All users ordered by username
    async fn list_users(&self) -> Result<Vec<User>>;

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<()>;
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn record_outstanding(&self, token: OutstandingToken) -> Result<()>;

    /// Revoke a refresh token, recording it as outstanding first if needed.
    /// Returns false when it was already revoked.
    async fn blacklist(&self, token: OutstandingToken) -> Result<bool>;

    async fn is_blacklisted(&self, jti: &str) -> Result<bool>;

    /// Drop outstanding tokens (and their revocations) that expired before `now`
    async fn flush_expired(&self, now: DateTime<Utc>) -> Result<usize>;
}
