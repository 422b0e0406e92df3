//! Doctor's consultation notes for a visit.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use utoipa::ToSchema;

use crate::{ClinicError, ClinicResult};

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct Consultation {
    pub id: i64,
    pub visit_id: i64,
    pub notes: Option<String>,
    pub prescription: Option<String>,
    pub require_referral: Option<bool>,
    pub created_at: NaiveDateTime,
    pub last_updated_at: NaiveDateTime,
    pub last_updated_by: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ConsultationInput {
    pub notes: Option<String>,
    pub prescription: Option<String>,
    pub require_referral: Option<bool>,
}

pub(crate) async fn upsert_in(
    conn: &mut SqliteConnection,
    visit_id: i64,
    input: &ConsultationInput,
    actor: Option<i64>,
) -> ClinicResult<Consultation> {
    sqlx::query_as::<_, Consultation>(
        r#"
        INSERT INTO consultation (visit_id, notes, prescription, require_referral, last_updated_by)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT (visit_id) DO UPDATE SET
            notes = excluded.notes,
            prescription = excluded.prescription,
            require_referral = excluded.require_referral,
            last_updated_by = excluded.last_updated_by,
            last_updated_at = CURRENT_TIMESTAMP
        RETURNING *
        "#,
    )
    .bind(visit_id)
    .bind(input.notes.as_deref())
    .bind(input.prescription.as_deref())
    .bind(input.require_referral)
    .bind(actor)
    .fetch_one(&mut *conn)
    .await
    .map_err(ClinicError::record_write)
}

pub(crate) async fn get_in(
    conn: &mut SqliteConnection,
    visit_id: i64,
) -> ClinicResult<Option<Consultation>> {
    let row = sqlx::query_as::<_, Consultation>("SELECT * FROM consultation WHERE visit_id = ?1")
        .bind(visit_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}
