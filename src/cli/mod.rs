//! CLI interface

pub mod commands;
mod output;

pub use output::*;

use clap::{Parser, Subcommand};

use crate::auth::UserRole;

#[derive(Parser)]
#[command(name = "techpredictor-auth")]
#[command(version)]
#[command(about = "JWT authentication service for TechPredictor", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new techpredictor.toml configuration file
    Init,

    /// Start the HTTP API server
    Serve {
        /// Host to bind to (defaults to server.host from the config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (defaults to server.port from the config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Create database tables
    Migrate,

    /// Provision a user account directly in the datastore
    CreateUser {
        #[arg(short, long)]
        username: String,

        #[arg(short, long, default_value = "operator", value_parser = parse_role)]
        role: UserRole,

        #[arg(short, long, default_value = "")]
        email: String,

        /// Account password
        #[arg(long, env = "TECHPREDICTOR_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Remove expired refresh tokens and their blacklist entries
    FlushExpired,
}

fn parse_role(value: &str) -> Result<UserRole, String> {
    value.parse().map_err(|e: crate::error::Error| e.to_string())
}
