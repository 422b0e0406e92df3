//! Clinic locations.
//!
//! Reference data for the villages and sites the mobile clinic serves.
//! Locations are soft-deleted so historical visits keep their foreign keys.

use serde::Serialize;
use sqlx::sqlite::SqlitePool;
use utoipa::ToSchema;

use crate::{ClinicError, ClinicResult};

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub is_active: bool,
}

#[derive(Clone)]
pub struct LocationService {
    pool: SqlitePool,
}

impl LocationService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn active(&self) -> ClinicResult<Vec<Location>> {
        let rows = sqlx::query_as::<_, Location>(
            "SELECT id, name, is_active FROM locations WHERE is_active = 1 ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn create(&self, name: &str) -> ClinicResult<Location> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClinicError::Validation("name is required".into()));
        }

        sqlx::query_as::<_, Location>(
            "INSERT INTO locations (name) VALUES (?1) RETURNING id, name, is_active",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(ClinicError::name_conflict)
    }

    pub async fn deactivate(&self, id: i64) -> ClinicResult<()> {
        let result = sqlx::query("UPDATE locations SET is_active = 0 WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ClinicError::NotFound("location"));
        }
        Ok(())
    }
}
