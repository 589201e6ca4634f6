//! Token lifecycle: login, refresh with rotation, revocation

use chrono::Utc;
use std::sync::Arc;

use crate::auth::jwt::{MintedToken, TokenIssuer, TokenType};
use crate::auth::models::User;
use crate::auth::password::PasswordHasher;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::store::{OutstandingToken, TokenStore, UserStore};

/// Result of a login or refresh. `refresh` is `None` when rotation is disabled.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: Option<MintedToken>,
}

/// Outcome of a best-effort revocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Revocation {
    Recorded,
    Failed(String),
}

/// Mints, rotates and revokes tokens against the configured stores
#[derive(Clone)]
pub struct TokenLifecycle {
    issuer: TokenIssuer,
    hasher: PasswordHasher,
    users: Arc<dyn UserStore>,
    tokens: Arc<dyn TokenStore>,
    rotate_refresh_tokens: bool,
    blacklist_after_rotation: bool,
    update_last_login: bool,
}

impl TokenLifecycle {
    pub fn new(config: &Config, users: Arc<dyn UserStore>, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            issuer: TokenIssuer::new(&config.jwt),
            hasher: PasswordHasher::new(&config.password),
            users,
            tokens,
            rotate_refresh_tokens: config.jwt.rotate_refresh_tokens,
            blacklist_after_rotation: config.jwt.blacklist_after_rotation,
            update_last_login: config.jwt.update_last_login,
        }
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// Check credentials and issue a fresh pair
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair> {
        let Some(user) = self.users.find_by_username(username).await? else {
            self.hasher.burn(password).await;
            return Err(Error::InvalidCredentials);
        };

        if !self.hasher.verify(password, &user.password_hash).await? || !user.is_active {
            tracing::debug!(username = %username, "Rejected login");
            return Err(Error::InvalidCredentials);
        }

        let refresh = self.record(self.issuer.mint_refresh(&user)?).await?;
        let access = self.issuer.access_for(&refresh.claims)?;

        if self.update_last_login {
            self.users.record_login(user.id, Utc::now()).await?;
        }

        tracing::info!(username = %user.username, jti = %refresh.claims.jti, "Issued token pair");
        Ok(TokenPair {
            access: access.token,
            refresh: Some(refresh),
        })
    }

    /// Exchange a refresh token for a new access token, rotating it when configured
    pub async fn refresh(&self, token: &str) -> Result<TokenPair> {
        let claims = self.issuer.decode(token, TokenType::Refresh)?;
        if self.tokens.is_blacklisted(&claims.jti).await? {
            tracing::debug!(jti = %claims.jti, "Rejected revoked refresh token");
            return Err(Error::TokenInvalid);
        }

        match self.users.find_by_id(claims.user_id).await? {
            Some(user) if user.is_active => {}
            _ => return Err(Error::InactiveTokenUser),
        }

        let access = self.issuer.access_for(&claims)?;

        let refresh = if self.rotate_refresh_tokens {
            if self.blacklist_after_rotation {
                self.tokens
                    .blacklist(OutstandingToken::new(&claims, token))
                    .await?;
            }
            let rotated = self.record(self.issuer.rotate(&claims)?).await?;
            tracing::debug!(old = %claims.jti, new = %rotated.claims.jti, "Rotated refresh token");
            Some(rotated)
        } else {
            None
        };

        Ok(TokenPair {
            access: access.token,
            refresh,
        })
    }

    /// Blacklist a refresh token. Never fails; the caller decides what to do with `Failed`.
    pub async fn revoke(&self, token: &str) -> Revocation {
        let attempt = async {
            let claims = self.issuer.decode(token, TokenType::Refresh)?;
            self.tokens
                .blacklist(OutstandingToken::new(&claims, token))
                .await
        };

        match attempt.await {
            Ok(true) => Revocation::Recorded,
            Ok(false) => Revocation::Failed("token already revoked".to_string()),
            Err(e) => Revocation::Failed(e.to_string()),
        }
    }

    /// Resolve a bearer access token to its active user
    pub async fn authenticate(&self, token: &str) -> Result<User> {
        let claims = self.issuer.decode(token, TokenType::Access)?;
        match self.users.find_by_id(claims.user_id).await? {
            Some(user) if user.is_active => Ok(user),
            _ => Err(Error::InactiveTokenUser),
        }
    }

    async fn record(&self, minted: MintedToken) -> Result<MintedToken> {
        self.tokens
            .record_outstanding(OutstandingToken::new(&minted.claims, &minted.token))
            .await?;
        Ok(minted)
    }
}
