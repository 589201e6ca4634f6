//! HTTP API server

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{AllowCredentials, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{CookiePolicy, PasswordHasher, TokenLifecycle};
use crate::config::{Config, ServerConfig};
use crate::error::Result;
use crate::store::{MemoryStore, PostgresStore, TokenStore, UserStore};

use super::routes;

/// Application state shared across handlers
pub struct AppState {
    pub config: Config,
    pub users: Arc<dyn UserStore>,
    pub lifecycle: TokenLifecycle,
    pub hasher: PasswordHasher,
    pub cookies: CookiePolicy,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: Config, users: Arc<dyn UserStore>, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            lifecycle: TokenLifecycle::new(&config, Arc::clone(&users), tokens),
            hasher: PasswordHasher::new(&config.password),
            cookies: CookiePolicy::new(&config),
            users,
            config,
        }
    }

    /// State backed by an in-memory store
    pub fn in_memory(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(config, store.clone(), store)
    }

    /// State backed by PostgreSQL when a database URL is configured, memory otherwise
    pub async fn connect(config: Config) -> Result<Self> {
        match config.database.url.clone() {
            Some(url) => {
                let store = Arc::new(PostgresStore::connect(&url).await?);
                store.migrate().await?;
                tracing::info!("Using PostgreSQL store");
                Ok(Self::new(config, store.clone(), store))
            }
            None => {
                tracing::warn!(
                    "No database configured; users and tokens are kept in memory and \
                     expired tokens are only dropped as new ones are recorded"
                );
                Ok(Self::in_memory(config))
            }
        }
    }
}

/// Run the HTTP API server
pub async fn run_server(config: Config, host: &str, port: u16) -> Result<()> {
    let state = Arc::new(AppState::connect(config).await?);

    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    serve(listener, state).await
}

/// Serve the API on an already bound listener
pub async fn serve(listener: TcpListener, state: SharedState) -> Result<()> {
    if state.config.server.debug {
        tracing::warn!("Debug mode: refresh cookies are sent without the Secure flag");
    }
    axum::serve(listener, create_router(state)).await?;
    Ok(())
}

/// Create the router with all routes
pub fn create_router(state: SharedState) -> Router {
    let cors = build_cors_layer(&state.config.server);
    Router::new()
        .route("/api/health", get(routes::health))
        // Token lifecycle
        .route("/api/token/", post(routes::obtain_token))
        .route("/api/token/refresh/", post(routes::refresh_token))
        .route("/api/logout/", post(routes::logout))
        // Accounts
        .route("/api/register/", post(routes::register))
        .route("/api/me/", get(routes::me))
        .route("/api/users/", get(routes::list_users))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Same-origin only unless origins are listed. Listed origins may send the
/// refresh cookie; `"*"` opens the API to any origin without credentials.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .max_age(Duration::from_secs(3600));

    if config.cors_origins.is_empty() {
        base
    } else if config.cors_origins.iter().any(|origin| origin == "*") {
        base.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        let listed = origins.clone();
        base.allow_origin(origins)
            .allow_credentials(AllowCredentials::predicate(move |origin, _| {
                listed.contains(origin)
            }))
    }
}
