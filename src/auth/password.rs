//! Password hashing

use crate::config::PasswordConfig;
use crate::error::{Error, Result};

/// bcrypt ignores everything past this many bytes
pub const MAX_PASSWORD_BYTES: usize = 72;

/// bcrypt hasher; work runs on the blocking pool so requests don't stall the runtime
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(config: &PasswordConfig) -> Self {
        Self {
            cost: config.bcrypt_cost,
        }
    }

    /// Hash a password. Passwords bcrypt would truncate are refused.
    pub async fn hash(&self, password: &str) -> Result<String> {
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(Error::field(
                "password",
                format!("Ensure this field has no more than {} bytes.", MAX_PASSWORD_BYTES),
            ));
        }
        let password = password.to_string();
        let cost = self.cost;
        let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
        Ok(hashed)
    }

    /// Check a password against a stored hash. A malformed hash or a password
    /// longer than bcrypt reads counts as a mismatch.
    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        if password.len() > MAX_PASSWORD_BYTES {
            return Ok(false);
        }
        let password = password.to_string();
        let hash = hash.to_string();
        let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await?;
        Ok(matches.unwrap_or(false))
    }

    /// Spend one hash computation so unknown usernames cost as much as wrong passwords
    pub async fn burn(&self, password: &str) {
        let password: String = password.chars().take(MAX_PASSWORD_BYTES / 4).collect();
        if let Err(e) = self.hash(&password).await {
            tracing::debug!("Dummy hash failed: {}", e);
        }
    }
}
