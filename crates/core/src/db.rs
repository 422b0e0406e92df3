//! Database pool and schema management.
//!
//! The pool is a process-scoped resource: opened once at startup, injected
//! into services, and closed on shutdown. Transactions are scoped to a
//! single checked-out connection and released on both success and failure,
//! so the pool never leaks a held connection.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
pub use sqlx::sqlite::SqlitePool;

use crate::config::CoreConfig;
use crate::{ClinicError, ClinicResult};

/// Embedded schema migrations, applied at startup.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Open the connection pool described by `cfg`.
///
/// Foreign keys are enabled on every connection; cascade deletes depend on
/// it. The database file is created if missing.
pub async fn connect(cfg: &CoreConfig) -> ClinicResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(cfg.database_url())
        .map_err(|e| ClinicError::Validation(format!("invalid database URL: {e}")))?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(cfg.max_connections())
        .acquire_timeout(cfg.acquire_timeout())
        .idle_timeout(cfg.idle_timeout())
        .connect_with(options)
        .await?;

    tracing::info!(
        "database connected ({}, {} connections max)",
        cfg.database_url(),
        cfg.max_connections()
    );

    Ok(pool)
}

/// Run the embedded migrations against `pool`.
pub async fn migrate(pool: &SqlitePool) -> ClinicResult<()> {
    MIGRATOR
        .run(pool)
        .await
        .map_err(|e| ClinicError::Database(sqlx::Error::Migrate(Box::new(e))))?;
    tracing::debug!("schema migrations applied");
    Ok(())
}

/// Open an in-memory database with the schema applied.
///
/// The pool is pinned to a single connection that is never reclaimed, since
/// an in-memory database lives and dies with its connection. Used by tests
/// and ephemeral tooling.
pub async fn connect_in_memory() -> ClinicResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(|e| ClinicError::Validation(format!("invalid database URL: {e}")))?
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    migrate(&pool).await?;
    Ok(pool)
}
