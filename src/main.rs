//! Deployable entry point for the mobile clinic record backend.
//!
//! Loads `.env`, initialises tracing, opens the database pool, applies
//! migrations and serves the REST API until shutdown.
//!
//! # Environment Variables
//! - `MCR_REST_ADDR`: listen address (default: "0.0.0.0:3000")
//! - `DATABASE_URL`: SQLite database (default: "sqlite://mcr.db")
//! - `MCR_DB_MAX_CONNECTIONS`: pool upper bound (default: 20)
//! - `MCR_JWT_SECRET`: token signing secret (required)
//! - `MCR_AUTH_MODE`: "permissive" (default) or "strict"
//! - `MCR_ALLOWED_ORIGIN`: CORS origin (default: permissive CORS)

use axum::http::HeaderValue;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use api_shared::auth::{AuthConfig, AuthMode};
use mcr_core::config::max_connections_from_env_value;
use mcr_core::CoreConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("MCR_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://mcr.db".into());
    let max_connections =
        max_connections_from_env_value(std::env::var("MCR_DB_MAX_CONNECTIONS").ok())?;

    let secret = match std::env::var("MCR_JWT_SECRET") {
        Ok(secret) if !secret.trim().is_empty() => secret,
        _ => anyhow::bail!("MCR_JWT_SECRET must be set"),
    };
    let mode = AuthMode::from_env_value(std::env::var("MCR_AUTH_MODE").ok())
        .map_err(anyhow::Error::msg)?;

    tracing::info!("++ Starting MCR on {}", addr);

    let cfg = CoreConfig::new(database_url)?.with_max_connections(max_connections);
    let pool = mcr_core::db::connect(&cfg).await?;
    mcr_core::db::migrate(&pool).await?;

    let state = AppState::new(pool.clone(), AuthConfig::new(secret, mode));

    let allowed_origin: Option<HeaderValue> = std::env::var("MCR_ALLOWED_ORIGIN")
        .ok()
        .map(|origin| origin.parse())
        .transpose()?;

    let app = api_rest::router(state, allowed_origin);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    pool.close().await;

    Ok(())
}
