//! JWT token handling

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::models::{User, UserRole};
use crate::config::JwtConfig;
use crate::error::{Error, Result};

/// Which half of the pair a token is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims shared by access and refresh tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    pub token_type: TokenType,
    /// Expiration time
    pub exp: i64,
    /// Issued at
    pub iat: i64,
    /// Unique token id, the blacklist key
    pub jti: String,
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
}

impl Claims {
    fn stamp(token_type: TokenType, lifetime: i64) -> (TokenType, i64, i64, String) {
        let now = Utc::now().timestamp();
        (token_type, now, now + lifetime, Uuid::new_v4().simple().to_string())
    }

    /// Claims for a new refresh token belonging to `user`
    pub fn refresh_for(user: &User, lifetime: i64) -> Self {
        let (token_type, iat, exp, jti) = Self::stamp(TokenType::Refresh, lifetime);
        Self {
            token_type,
            exp,
            iat,
            jti,
            user_id: user.id,
            username: user.username.clone(),
            role: user.role,
        }
    }

    /// Copy the identity claims under a fresh type, id and expiry
    pub fn reissue(&self, token_type: TokenType, lifetime: i64) -> Self {
        let (token_type, iat, exp, jti) = Self::stamp(token_type, lifetime);
        Self {
            token_type,
            exp,
            iat,
            jti,
            user_id: self.user_id,
            username: self.username.clone(),
            role: self.role,
        }
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.iat, 0).single().unwrap_or_else(Utc::now)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_else(Utc::now)
    }

    /// Check if token is expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// An encoded token together with the claims it carries
#[derive(Debug, Clone)]
pub struct MintedToken {
    pub token: String,
    pub claims: Claims,
}

/// Signs and verifies tokens with the configured secret and lifetimes
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_lifetime: i64,
    refresh_lifetime: i64,
}

impl TokenIssuer {
    pub fn new(config: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            access_lifetime: config.access_token_lifetime_secs,
            refresh_lifetime: config.refresh_token_lifetime_secs,
        }
    }

    pub fn refresh_lifetime_secs(&self) -> i64 {
        self.refresh_lifetime
    }

    /// Mint a refresh token for a user who just proved their credentials
    pub fn mint_refresh(&self, user: &User) -> Result<MintedToken> {
        self.mint(Claims::refresh_for(user, self.refresh_lifetime))
    }

    /// Derive an access token from verified refresh claims
    pub fn access_for(&self, refresh: &Claims) -> Result<MintedToken> {
        self.mint(refresh.reissue(TokenType::Access, self.access_lifetime))
    }

    /// Replacement refresh token for the same identity
    pub fn rotate(&self, refresh: &Claims) -> Result<MintedToken> {
        self.mint(refresh.reissue(TokenType::Refresh, self.refresh_lifetime))
    }

    /// Sign arbitrary claims
    pub fn mint(&self, claims: Claims) -> Result<MintedToken> {
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| Error::TokenEncoding(e.to_string()))?;
        Ok(MintedToken { token, claims })
    }

    /// Verify signature, expiry and type. Every failure is reported as `TokenInvalid`.
    pub fn decode(&self, token: &str, expected: TokenType) -> Result<Claims> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Rejected token: {}", e);
                Error::TokenInvalid
            })?;

        if claims.token_type != expected {
            tracing::debug!("Rejected {:?} token where {:?} was expected", claims.token_type, expected);
            return Err(Error::TokenInvalid);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(&JwtConfig::default())
    }

    fn user() -> User {
        User::new("alice".to_string(), "hash".to_string(), UserRole::Dispatcher)
    }

    #[test]
    fn test_mint_and_decode_refresh() {
        let issuer = issuer();
        let user = user();
        let minted = issuer.mint_refresh(&user).unwrap();
        let claims = issuer.decode(&minted.token, TokenType::Refresh).unwrap();

        assert_eq!(claims, minted.claims);
        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role, UserRole::Dispatcher);
        assert_eq!(claims.exp - claims.iat, 86400);
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_access_token_derives_identity() {
        let issuer = issuer();
        let refresh = issuer.mint_refresh(&user()).unwrap();
        let access = issuer.access_for(&refresh.claims).unwrap();

        assert_eq!(access.claims.token_type, TokenType::Access);
        assert_eq!(access.claims.user_id, refresh.claims.user_id);
        assert_ne!(access.claims.jti, refresh.claims.jti);
        assert_eq!(access.claims.exp - access.claims.iat, 300);
    }

    #[test]
    fn test_token_type_is_enforced() {
        let issuer = issuer();
        let refresh = issuer.mint_refresh(&user()).unwrap();
        let access = issuer.access_for(&refresh.claims).unwrap();

        assert!(matches!(
            issuer.decode(&refresh.token, TokenType::Access),
            Err(Error::TokenInvalid)
        ));
        assert!(matches!(
            issuer.decode(&access.token, TokenType::Refresh),
            Err(Error::TokenInvalid)
        ));
    }

    #[test]
    fn test_rotation_changes_jti() {
        let issuer = issuer();
        let refresh = issuer.mint_refresh(&user()).unwrap();
        let rotated = issuer.rotate(&refresh.claims).unwrap();

        assert_ne!(rotated.claims.jti, refresh.claims.jti);
        assert_eq!(rotated.claims.user_id, refresh.claims.user_id);
        assert!(issuer.decode(&rotated.token, TokenType::Refresh).is_ok());
    }

    #[test]
    fn test_expired_token_rejected() {
        let issuer = issuer();
        let mut claims = Claims::refresh_for(&user(), 60);
        claims.iat -= 120;
        claims.exp -= 120;
        let minted = issuer.mint(claims).unwrap();

        assert!(minted.claims.is_expired());
        assert!(matches!(
            issuer.decode(&minted.token, TokenType::Refresh),
            Err(Error::TokenInvalid)
        ));
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let other = TokenIssuer::new(&JwtConfig {
            secret: "another-secret".to_string(),
            ..JwtConfig::default()
        });
        let minted = other.mint_refresh(&user()).unwrap();

        assert!(issuer().decode(&minted.token, TokenType::Refresh).is_err());
        assert!(issuer().decode("invalid.token.here", TokenType::Refresh).is_err());
    }
}
