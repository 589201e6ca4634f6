//! Configuration loading and environment variable interpolation

use crate::error::{Error, Result};
use regex::Regex;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::Config;

pub const CONFIG_FILENAME: &str = "techpredictor.toml";

/// Load configuration from techpredictor.toml
pub fn load_config() -> Result<Config> {
    let config_path = find_config_file()?;
    load_config_from_path(&config_path)
}

/// Load configuration from a specific path
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|_| Error::ConfigNotFound)?;
    let content = interpolate_env_vars(&content);
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    tracing::debug!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Find the configuration file, searching upward from current directory
fn find_config_file() -> Result<PathBuf> {
    let mut current = env::current_dir().map_err(|e| Error::Config(e.to_string()))?;

    loop {
        let config_path = current.join(CONFIG_FILENAME);
        if config_path.exists() {
            return Ok(config_path);
        }

        if !current.pop() {
            return Err(Error::ConfigNotFound);
        }
    }
}

/// Interpolate environment variables in the format ${VAR_NAME} or ${VAR_NAME:-default}
fn interpolate_env_vars(content: &str) -> String {
    // Compile-time constant pattern; failure here is a bug in the codebase
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}")
        .expect("Invalid regex pattern - this is a bug in the codebase");

    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");

        env::var(var_name).unwrap_or_else(|_| default.to_string())
    })
    .to_string()
}

/// Generate a default configuration file content
pub fn default_config_content() -> &'static str {
    r#"# TechPredictor authentication service configuration

[server]
host = "0.0.0.0"
port = 8000
# Development mode: refresh cookie without Secure, SameSite=Lax
debug = ${TECHPREDICTOR_DEBUG:-false}
# Browser origins allowed to send the refresh cookie cross-origin
cors_origins = []

[jwt]
# Required outside debug mode: at least 32 bytes
secret = "${TECHPREDICTOR_JWT_SECRET:-change-me}"
access_token_lifetime_secs = 300
refresh_token_lifetime_secs = 86400
rotate_refresh_tokens = true
# Revoke the old refresh token immediately on rotation
blacklist_after_rotation = false
update_last_login = false

[cookie]
name = "app_refresh"
path = "/api/token/refresh/"

[password]
bcrypt_cost = 12

# Without a database URL users and tokens live in memory
# [database]
# url = "${DATABASE_URL}"
"#
}
