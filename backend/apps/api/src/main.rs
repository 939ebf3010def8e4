//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `kernel::error::AppError`.

use anyhow::Context;
use axum::{
    Router, http,
    http::{Method, header},
};
use base64::Engine;
use base64::engine::general_purpose;
use identity::application::notifier::TracingProfileNotifier;
use identity::{IdentityConfig, PgAccountStore, identity_router};
use sqlx::postgres::PgPoolOptions;
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Re-export unified error types for use in handlers
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,identity=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Database connection
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set in environment")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("../../../database/migrations")
        .run(&pool)
        .await?;

    tracing::info!("Migrations completed");

    let identity_config = load_identity_config()?;
    let request_timeout = identity_config.request_timeout;

    // CORS configuration
    let frontend_origins = env::var("FRONTEND_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:40922,http://127.0.0.1:40922".to_string());

    let allowed_origins: Vec<http::HeaderValue> = frontend_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]))
        .allow_credentials(true);

    // Build router
    let identity = identity_router(
        PgAccountStore::new(pool.clone()),
        identity_config,
        Arc::new(TracingProfileNotifier),
    )?;

    let app = Router::new()
        .nest("/api/identity", identity)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr: SocketAddr = env::var("BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:31113".to_string())
        .parse()
        .context("BIND_ADDR must be a socket address")?;
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Identity configuration from the environment
///
/// Debug builds fall back to random secrets; release builds require them.
fn load_identity_config() -> anyhow::Result<IdentityConfig> {
    let mut config = if cfg!(debug_assertions) {
        IdentityConfig::development()
    } else {
        IdentityConfig::default()
    };

    if let Some(secret) = secret_from_env("IDENTITY_TOKEN_SECRET")? {
        config.token_secret = secret;
    }
    if let Some(secret) = secret_from_env("IDENTITY_STATE_SECRET")? {
        config.state_secret = secret;
    }
    if let Some(secret) = secret_from_env("IDENTITY_ASSERTION_SECRET")? {
        config.assertion_secret = secret;
    }
    if let Ok(issuer) = env::var("IDENTITY_ASSERTION_ISSUER") {
        config.assertion_issuer = issuer;
    }
    if let Some(pepper) = secret_from_env("IDENTITY_PASSWORD_PEPPER")? {
        config.password_pepper = Some(pepper);
    }
    if let Ok(issuer) = env::var("IDENTITY_ISSUER") {
        config.issuer = issuer;
    }
    if let Some(secs) = number_from_env("IDENTITY_ACCESS_TTL_SECS")? {
        config.access_token_ttl = Duration::from_secs(secs);
    }
    if let Some(days) = number_from_env("IDENTITY_REFRESH_TTL_DAYS")? {
        config = config.with_refresh_ttl_days(days)?;
    }
    if let Some(secs) = number_from_env("IDENTITY_REQUEST_TIMEOUT_SECS")? {
        config.request_timeout = Duration::from_secs(secs);
    }

    config
        .validate()
        .context("Identity configuration is incomplete (set IDENTITY_TOKEN_SECRET, IDENTITY_STATE_SECRET and IDENTITY_ASSERTION_SECRET)")?;

    tracing::info!(config = ?config, "Identity configuration loaded");

    Ok(config)
}

/// Base64 (standard alphabet) secret
fn secret_from_env(name: &str) -> anyhow::Result<Option<Vec<u8>>> {
    match env::var(name) {
        Ok(value) => {
            let bytes = general_purpose::STANDARD
                .decode(value.trim())
                .with_context(|| format!("{name} must be base64"))?;
            Ok(Some(bytes))
        }
        Err(_) => Ok(None),
    }
}

fn number_from_env(name: &str) -> anyhow::Result<Option<u64>> {
    match env::var(name) {
        Ok(value) => {
            let number = value
                .trim()
                .parse()
                .with_context(|| format!("{name} must be a whole number"))?;
            Ok(Some(number))
        }
        Err(_) => Ok(None),
    }
}
