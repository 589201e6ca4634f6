//! PostgreSQL-backed store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio_postgres::error::SqlState;
use tokio_postgres::{Client, NoTls, Row};
use uuid::Uuid;

use super::{OutstandingToken, TokenStore, UserStore};
use crate::auth::models::User;
use crate::error::{Error, Result};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS auth_users (
    id UUID PRIMARY KEY,
    username VARCHAR(150) NOT NULL UNIQUE,
    password TEXT NOT NULL,
    email VARCHAR(254) NOT NULL DEFAULT '',
    first_name VARCHAR(150) NOT NULL DEFAULT '',
    last_name VARCHAR(150) NOT NULL DEFAULT '',
    role VARCHAR(32) NOT NULL DEFAULT 'operator' CHECK (role IN ('dispatcher', 'operator')),
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    date_joined TIMESTAMPTZ NOT NULL,
    last_login TIMESTAMPTZ
);

CREATE TABLE IF NOT EXISTS auth_outstanding_tokens (
    jti VARCHAR(64) PRIMARY KEY,
    user_id UUID REFERENCES auth_users(id) ON DELETE CASCADE,
    token TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    expires_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS auth_blacklisted_tokens (
    jti VARCHAR(64) PRIMARY KEY REFERENCES auth_outstanding_tokens(jti) ON DELETE CASCADE,
    blacklisted_at TIMESTAMPTZ NOT NULL
);
"#;

const USER_COLUMNS: &str =
    "id, username, password, email, first_name, last_name, role, is_active, date_joined, last_login";

/// Users and tokens in PostgreSQL; clones share one connection
#[derive(Clone)]
pub struct PostgresStore {
    client: Arc<Client>,
}

impl PostgresStore {
    /// Connect using a libpq-style or URL connection string
    pub async fn connect(url: &str) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(url, NoTls).await?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("PostgreSQL connection error: {}", e);
            }
        });

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Create tables if they don't exist yet
    pub async fn migrate(&self) -> Result<()> {
        self.client.batch_execute(SCHEMA).await?;
        tracing::info!("Database schema is up to date");
        Ok(())
    }
}

fn user_from_row(row: &Row) -> Result<User> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password")?,
        email: row.try_get("email")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        role: role.parse()?,
        is_active: row.try_get("is_active")?,
        date_joined: row.try_get("date_joined")?,
        last_login: row.try_get("last_login")?,
    })
}

#[async_trait]
impl UserStore for PostgresStore {
    async fn create_user(&self, user: User) -> Result<User> {
        let result = self
            .client
            .execute(
                "INSERT INTO auth_users \
                 (id, username, password, email, first_name, last_name, role, is_active, date_joined, last_login) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
                &[
                    &user.id,
                    &user.username,
                    &user.password_hash,
                    &user.email,
                    &user.first_name,
                    &user.last_name,
                    &user.role.as_str(),
                    &user.is_active,
                    &user.date_joined,
                    &user.last_login,
                ],
            )
            .await;

        match result {
            Ok(_) => Ok(user),
            Err(e) if e.code() == Some(&SqlState::UNIQUE_VIOLATION) => Err(Error::UsernameTaken),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let query = format!("SELECT {} FROM auth_users WHERE username = $1", USER_COLUMNS);
        self.client
            .query_opt(&query, &[&username])
            .await?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let query = format!("SELECT {} FROM auth_users WHERE id = $1", USER_COLUMNS);
        self.client
            .query_opt(&query, &[&id])
            .await?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let query = format!("SELECT {} FROM auth_users ORDER BY username", USER_COLUMNS);
        self.client
            .query(&query, &[])
            .await?
            .iter()
            .map(user_from_row)
            .collect()
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        self.client
            .execute("UPDATE auth_users SET last_login = $2 WHERE id = $1", &[&id, &at])
            .await?;
        Ok(())
    }
}

#[async_trait]
impl TokenStore for PostgresStore {
    async fn record_outstanding(&self, token: OutstandingToken) -> Result<()> {
        self.client
            .execute(
                "INSERT INTO auth_outstanding_tokens (jti, user_id, token, created_at, expires_at) \
                 VALUES ($1, $2, $3, $4, $5) ON CONFLICT (jti) DO NOTHING",
                &[
                    &token.jti,
                    &token.user_id,
                    &token.token,
                    &token.created_at,
                    &token.expires_at,
                ],
            )
            .await?;
        Ok(())
    }

    async fn blacklist(&self, token: OutstandingToken) -> Result<bool> {
        let jti = token.jti.clone();
        self.record_outstanding(token).await?;
        let inserted = self
            .client
            .execute(
                "INSERT INTO auth_blacklisted_tokens (jti, blacklisted_at) \
                 VALUES ($1, $2) ON CONFLICT (jti) DO NOTHING",
                &[&jti, &Utc::now()],
            )
            .await?;
        Ok(inserted == 1)
    }

    async fn is_blacklisted(&self, jti: &str) -> Result<bool> {
        let row = self
            .client
            .query_opt("SELECT 1 FROM auth_blacklisted_tokens WHERE jti = $1", &[&jti])
            .await?;
        Ok(row.is_some())
    }

    async fn flush_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let deleted = self
            .client
            .execute("DELETE FROM auth_outstanding_tokens WHERE expires_at < $1", &[&now])
            .await?;
        Ok(deleted as usize)
    }
}
