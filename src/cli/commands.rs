//! CLI command implementations

use anyhow::{bail, Result};
use std::fs;
use std::path::Path;

use crate::auth::{register, PasswordHasher, RegisterRequest, UserInfo, UserRole};
use crate::cli::{error, info, print_user_detail, success, warn};
use crate::config::{self, loader::CONFIG_FILENAME, Config};
use crate::error::Error;
use crate::store::{PostgresStore, TokenStore};

/// Initialize a new techpredictor.toml configuration file
pub async fn init() -> Result<()> {
    let config_path = Path::new(CONFIG_FILENAME);

    if config_path.exists() {
        warn(&format!("{} already exists", CONFIG_FILENAME));
        return Ok(());
    }

    fs::write(config_path, config::loader::default_config_content())?;

    success(&format!("Created {}", CONFIG_FILENAME));
    info("Set jwt.secret and database.url, then run 'techpredictor-auth migrate'");

    Ok(())
}

/// Start the HTTP API server
pub async fn serve(host: Option<String>, port: Option<u16>) -> Result<()> {
    let config = config::load_config()?;
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    info(&format!("Starting server at http://{}:{}", host, port));

    crate::api::run_server(config, &host, port).await?;
    Ok(())
}

/// Create database tables
pub async fn migrate() -> Result<()> {
    let store = connect(&config::load_config()?).await?;
    store.migrate().await?;
    success("Database schema is up to date");
    Ok(())
}

/// Provision a user account
pub async fn create_user(username: String, role: UserRole, email: String, password: String) -> Result<()> {
    let config = config::load_config()?;
    let store = connect(&config).await?;
    let hasher = PasswordHasher::new(&config.password);

    let request = RegisterRequest {
        username: Some(username),
        password: Some(password),
        email: Some(email),
        role: Some(role.to_string()),
        ..RegisterRequest::default()
    };

    match register(&store, &hasher, request).await {
        Ok(user) => {
            success("Created user");
            print_user_detail(&UserInfo::from(user));
            Ok(())
        }
        Err(Error::Validation(errors)) => {
            for (field, messages) in errors {
                error(&format!("{}: {}", field, messages.join(" ")));
            }
            bail!("user not created")
        }
        Err(e) => {
            error(&format!("Failed to create user: {}", e));
            Err(e.into())
        }
    }
}

/// Remove expired refresh tokens
pub async fn flush_expired() -> Result<()> {
    let store = connect(&config::load_config()?).await?;
    let removed = store.flush_expired(chrono::Utc::now()).await?;
    success(&format!("Removed {} expired refresh token(s)", removed));
    Ok(())
}

async fn connect(config: &Config) -> Result<PostgresStore> {
    let Some(url) = config.database.url.as_deref() else {
        bail!("database.url is not set; this command needs a persistent store");
    };
    Ok(PostgresStore::connect(url).await?)
}
