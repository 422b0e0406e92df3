//! Snellen visual acuity readings for a visit.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use utoipa::ToSchema;

use crate::{ClinicError, ClinicResult};

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct VisualAcuity {
    pub id: i64,
    pub visit_id: i64,
    pub left_with_pinhole: Option<String>,
    pub left_without_pinhole: Option<String>,
    pub right_with_pinhole: Option<String>,
    pub right_without_pinhole: Option<String>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub last_updated_at: NaiveDateTime,
    pub last_updated_by: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct VisualAcuityInput {
    pub left_with_pinhole: Option<String>,
    pub left_without_pinhole: Option<String>,
    pub right_with_pinhole: Option<String>,
    pub right_without_pinhole: Option<String>,
    pub notes: Option<String>,
}

pub(crate) async fn upsert_in(
    conn: &mut SqliteConnection,
    visit_id: i64,
    input: &VisualAcuityInput,
    actor: Option<i64>,
) -> ClinicResult<VisualAcuity> {
    sqlx::query_as::<_, VisualAcuity>(
        r#"
        INSERT INTO visual_acuity (visit_id, left_with_pinhole, left_without_pinhole,
                                   right_with_pinhole, right_without_pinhole, notes, last_updated_by)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT (visit_id) DO UPDATE SET
            left_with_pinhole = excluded.left_with_pinhole,
            left_without_pinhole = excluded.left_without_pinhole,
            right_with_pinhole = excluded.right_with_pinhole,
            right_without_pinhole = excluded.right_without_pinhole,
            notes = excluded.notes,
            last_updated_by = excluded.last_updated_by,
            last_updated_at = CURRENT_TIMESTAMP
        RETURNING *
        "#,
    )
    .bind(visit_id)
    .bind(input.left_with_pinhole.as_deref())
    .bind(input.left_without_pinhole.as_deref())
    .bind(input.right_with_pinhole.as_deref())
    .bind(input.right_without_pinhole.as_deref())
    .bind(input.notes.as_deref())
    .bind(actor)
    .fetch_one(&mut *conn)
    .await
    .map_err(ClinicError::record_write)
}

pub(crate) async fn get_in(
    conn: &mut SqliteConnection,
    visit_id: i64,
) -> ClinicResult<Option<VisualAcuity>> {
    let row = sqlx::query_as::<_, VisualAcuity>("SELECT * FROM visual_acuity WHERE visit_id = ?1")
        .bind(visit_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}
