//! Pharmacy stock ledger.
//!
//! Independent of patients and visits. Stock never goes negative: absolute
//! sets and relative adjustments are both clamped at zero in SQL, so an
//! over-subtraction is not an error.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;
use utoipa::ToSchema;

use crate::{ClinicError, ClinicResult};

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct PharmacyItem {
    pub id: i64,
    pub name: String,
    pub stock_level: i64,
    pub last_updated_at: NaiveDateTime,
    pub last_updated_by: Option<i64>,
}

/// Absolute update: omitted fields are left alone.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PharmacyItemUpdate {
    pub name: Option<String>,
    pub stock_level: Option<i64>,
}

#[derive(Clone)]
pub struct PharmacyService {
    pool: SqlitePool,
}

impl PharmacyService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> ClinicResult<Vec<PharmacyItem>> {
        let rows =
            sqlx::query_as::<_, PharmacyItem>("SELECT * FROM pharmacy ORDER BY name ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }

    pub async fn create(
        &self,
        name: &str,
        initial_stock: i64,
        actor: Option<i64>,
    ) -> ClinicResult<PharmacyItem> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClinicError::Validation("name is required".into()));
        }
        if initial_stock < 0 {
            return Err(ClinicError::Validation(
                "stock_level must be non-negative".into(),
            ));
        }

        sqlx::query_as::<_, PharmacyItem>(
            r#"
            INSERT INTO pharmacy (name, stock_level, last_updated_by)
            VALUES (?1, ?2, ?3)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(initial_stock)
        .bind(actor)
        .fetch_one(&self.pool)
        .await
        .map_err(ClinicError::name_conflict)
    }

    /// Rename and/or set stock to an exact value, clamped at zero.
    pub async fn set(
        &self,
        id: i64,
        update: &PharmacyItemUpdate,
        actor: Option<i64>,
    ) -> ClinicResult<PharmacyItem> {
        let name = update.name.as_deref().map(str::trim).filter(|n| !n.is_empty());

        sqlx::query_as::<_, PharmacyItem>(
            r#"
            UPDATE pharmacy
               SET name = COALESCE(?1, name),
                   stock_level = MAX(0, COALESCE(?2, stock_level)),
                   last_updated_at = CURRENT_TIMESTAMP,
                   last_updated_by = ?3
             WHERE id = ?4
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(update.stock_level)
        .bind(actor)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(ClinicError::name_conflict)?
        .ok_or(ClinicError::NotFound("pharmacy item"))
    }

    /// Adjust stock by a delta, clamped at zero.
    pub async fn adjust(
        &self,
        id: i64,
        delta: i64,
        actor: Option<i64>,
    ) -> ClinicResult<PharmacyItem> {
        sqlx::query_as::<_, PharmacyItem>(
            r#"
            UPDATE pharmacy
               SET stock_level = MAX(0, stock_level + ?1),
                   last_updated_at = CURRENT_TIMESTAMP,
                   last_updated_by = ?2
             WHERE id = ?3
            RETURNING *
            "#,
        )
        .bind(delta)
        .bind(actor)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ClinicError::NotFound("pharmacy item"))
    }

    pub async fn delete(&self, id: i64) -> ClinicResult<()> {
        let result = sqlx::query("DELETE FROM pharmacy WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ClinicError::NotFound("pharmacy item"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod pharmacy_tests {
    use super::*;
    use crate::db::connect_in_memory;

    #[tokio::test]
    async fn adjustments_clamp_at_zero() {
        let pool = connect_in_memory().await.unwrap();
        let service = PharmacyService::new(pool);

        let item = service.create("Paracetamol 500mg", 100, None).await.unwrap();

        let mut level = item.stock_level;
        for delta in [-30, 10, -1000] {
            level = service.adjust(item.id, delta, None).await.unwrap().stock_level;
        }
        assert_eq!(level, 0);
    }

    #[tokio::test]
    async fn absolute_set_clamps_and_renames() {
        let pool = connect_in_memory().await.unwrap();
        let service = PharmacyService::new(pool);

        let item = service.create("Amoxicillin", 5, None).await.unwrap();
        let updated = service
            .set(
                item.id,
                &PharmacyItemUpdate {
                    name: Some("Amoxicillin 250mg".into()),
                    stock_level: Some(-3),
                },
                None,
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Amoxicillin 250mg");
        assert_eq!(updated.stock_level, 0);
    }

    #[tokio::test]
    async fn duplicate_item_names_conflict() {
        let pool = connect_in_memory().await.unwrap();
        let service = PharmacyService::new(pool);

        service.create("ORS sachet", 10, None).await.unwrap();
        let err = service
            .create("ORS sachet", 1, None)
            .await
            .expect_err("expected conflict");
        assert!(matches!(err, ClinicError::DuplicateName));
    }

    #[tokio::test]
    async fn missing_items_are_not_found() {
        let pool = connect_in_memory().await.unwrap();
        let service = PharmacyService::new(pool);

        let err = service.adjust(99, 1, None).await.expect_err("expected not found");
        assert!(matches!(err, ClinicError::NotFound(_)));

        let err = service.delete(99).await.expect_err("expected not found");
        assert!(matches!(err, ClinicError::NotFound(_)));
    }
}
