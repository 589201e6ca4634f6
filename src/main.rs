use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use techpredictor_auth::cli::{self, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "techpredictor_auth=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => cli::commands::init().await,
        Commands::Serve { host, port } => cli::commands::serve(host, port).await,
        Commands::Migrate => cli::commands::migrate().await,
        Commands::CreateUser {
            username,
            role,
            email,
            password,
        } => cli::commands::create_user(username, role, email, password).await,
        Commands::FlushExpired => cli::commands::flush_expired().await,
    }
}
