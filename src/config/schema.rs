//! Configuration schema definitions

use serde::{Deserialize, Serialize};

/// Cost bounds accepted by bcrypt
pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;

/// Shortest signing secret accepted outside debug mode
pub const MIN_SECRET_LENGTH: usize = 32;

/// Secrets shipped in defaults and the generated config file
const PLACEHOLDER_SECRETS: [&str; 2] = ["change-me", "techpredictor-secret-key-change-in-production"];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub jwt: JwtConfig,

    #[serde(default)]
    pub cookie: CookieConfig,

    #[serde(default)]
    pub password: PasswordConfig,

    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Server configuration for the HTTP API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Development mode: refresh cookies drop `Secure` and use `SameSite=Lax`
    #[serde(default)]
    pub debug: bool,

    /// Origins allowed to make credentialed cross-origin requests.
    /// Empty means same-origin only; `"*"` allows any origin without credentials.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            debug: false,
            cors_origins: Vec::new(),
        }
    }
}

/// Token signing and lifetime settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    #[serde(default = "default_secret")]
    pub secret: String,

    #[serde(default = "default_access_lifetime")]
    pub access_token_lifetime_secs: i64,

    #[serde(default = "default_refresh_lifetime")]
    pub refresh_token_lifetime_secs: i64,

    /// Mint a fresh refresh token on every refresh
    #[serde(default = "default_true")]
    pub rotate_refresh_tokens: bool,

    /// Revoke the presented refresh token when it is rotated out.
    /// Off means the previous token stays usable until it expires.
    #[serde(default)]
    pub blacklist_after_rotation: bool,

    #[serde(default)]
    pub update_last_login: bool,
}

fn default_secret() -> String {
    "techpredictor-secret-key-change-in-production".to_string()
}

fn default_access_lifetime() -> i64 {
    5 * 60
}

fn default_refresh_lifetime() -> i64 {
    24 * 60 * 60
}

fn default_true() -> bool {
    true
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: default_secret(),
            access_token_lifetime_secs: default_access_lifetime(),
            refresh_token_lifetime_secs: default_refresh_lifetime(),
            rotate_refresh_tokens: true,
            blacklist_after_rotation: false,
            update_last_login: false,
        }
    }
}

/// Refresh cookie naming and scope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieConfig {
    #[serde(default = "default_cookie_name")]
    pub name: String,

    #[serde(default = "default_cookie_path")]
    pub path: String,
}

fn default_cookie_name() -> String {
    "app_refresh".to_string()
}

fn default_cookie_path() -> String {
    "/api/token/refresh/".to_string()
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: default_cookie_name(),
            path: default_cookie_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordConfig {
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            bcrypt_cost: default_bcrypt_cost(),
        }
    }
}

/// Datastore connection. Without a URL the service keeps users and tokens in memory.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: Option<String>,
}

impl Config {
    /// Validate settings that would otherwise fail at request time
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::Error;

        if self.jwt.secret.is_empty() {
            return Err(Error::Config("jwt.secret must not be empty".to_string()));
        }
        if !self.server.debug {
            if PLACEHOLDER_SECRETS.contains(&self.jwt.secret.as_str()) {
                return Err(Error::Config(
                    "jwt.secret is a placeholder; set TECHPREDICTOR_JWT_SECRET".to_string(),
                ));
            }
            if self.jwt.secret.len() < MIN_SECRET_LENGTH {
                return Err(Error::Config(format!(
                    "jwt.secret must be at least {} bytes outside debug mode",
                    MIN_SECRET_LENGTH
                )));
            }
        }
        if self.server.cors_origins.len() > 1 && self.server.cors_origins.iter().any(|o| o == "*") {
            return Err(Error::Config(
                "server.cors_origins cannot mix \"*\" with explicit origins".to_string(),
            ));
        }
        if self.jwt.access_token_lifetime_secs <= 0 || self.jwt.refresh_token_lifetime_secs <= 0 {
            return Err(Error::Config("token lifetimes must be positive".to_string()));
        }
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.password.bcrypt_cost) {
            return Err(Error::Config(format!(
                "password.bcrypt_cost must be between {} and {}",
                MIN_BCRYPT_COST,
                MAX_BCRYPT_COST
            )));
        }
        if !self.cookie.path.starts_with('/') {
            return Err(Error::Config("cookie.path must start with '/'".to_string()));
        }
        Ok(())
    }
}
