//! Presenting complaint captured at triage.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use utoipa::ToSchema;

use crate::{ClinicError, ClinicResult};

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct PresentingComplaint {
    pub id: i64,
    pub visit_id: i64,
    pub history: Option<String>,
    pub red_flags: Option<String>,
    pub systems_review: Option<String>,
    pub drug_allergies: Option<String>,
    pub created_at: NaiveDateTime,
    pub last_updated_at: NaiveDateTime,
    pub last_updated_by: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PresentingComplaintInput {
    pub history: Option<String>,
    pub red_flags: Option<String>,
    pub systems_review: Option<String>,
    pub drug_allergies: Option<String>,
}

pub(crate) async fn upsert_in(
    conn: &mut SqliteConnection,
    visit_id: i64,
    input: &PresentingComplaintInput,
    actor: Option<i64>,
) -> ClinicResult<PresentingComplaint> {
    sqlx::query_as::<_, PresentingComplaint>(
        r#"
        INSERT INTO presenting_complaint (visit_id, history, red_flags, systems_review,
                                          drug_allergies, last_updated_by)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT (visit_id) DO UPDATE SET
            history = excluded.history,
            red_flags = excluded.red_flags,
            systems_review = excluded.systems_review,
            drug_allergies = excluded.drug_allergies,
            last_updated_by = excluded.last_updated_by,
            last_updated_at = CURRENT_TIMESTAMP
        RETURNING *
        "#,
    )
    .bind(visit_id)
    .bind(input.history.as_deref())
    .bind(input.red_flags.as_deref())
    .bind(input.systems_review.as_deref())
    .bind(input.drug_allergies.as_deref())
    .bind(actor)
    .fetch_one(&mut *conn)
    .await
    .map_err(ClinicError::record_write)
}

pub(crate) async fn get_in(
    conn: &mut SqliteConnection,
    visit_id: i64,
) -> ClinicResult<Option<PresentingComplaint>> {
    let row = sqlx::query_as::<_, PresentingComplaint>(
        "SELECT * FROM presenting_complaint WHERE visit_id = ?1",
    )
    .bind(visit_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}
