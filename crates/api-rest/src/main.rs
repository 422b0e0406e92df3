//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own.
//!
//! ## Intended use
//! Useful for development and debugging when you only want the REST server
//! (with OpenAPI/Swagger UI). The workspace's main `mcr-run` binary is the
//! deployable entry point.

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

    tracing::info!("-- Starting MCR REST API on {}", addr);

    let cfg = CoreConfig::new(database_url)?.with_max_connections(max_connections);
    let pool = mcr_core::db::connect(&cfg).await?;
    mcr_core::db::migrate(&pool).await?;

    // Dev binary: a throwaway secret is acceptable here, unlike mcr-run.
    let secret = std::env::var("MCR_JWT_SECRET").unwrap_or_else(|_| "dev-secret".into());
    let mode = AuthMode::from_env_value(std::env::var("MCR_AUTH_MODE").ok())
        .map_err(anyhow::Error::msg)?;
    let state = AppState::new(pool, AuthConfig::new(secret, mode));

    let allowed_origin: Option<HeaderValue> = std::env::var("MCR_ALLOWED_ORIGIN")
        .ok()
        .map(|origin| origin.parse())
        .transpose()?;

    let app = api_rest::router(state, allowed_origin);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
