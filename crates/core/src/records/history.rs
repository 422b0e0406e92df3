//! Medical history for a visit.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use utoipa::ToSchema;

use crate::{ClinicError, ClinicResult};

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct History {
    pub id: i64,
    pub visit_id: i64,
    pub past: Option<String>,
    pub drug_and_treatment: Option<String>,
    pub family: Option<String>,
    pub social: Option<String>,
    pub systems_review: Option<String>,
    pub created_at: NaiveDateTime,
    pub last_updated_at: NaiveDateTime,
    pub last_updated_by: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct HistoryInput {
    pub past: Option<String>,
    pub drug_and_treatment: Option<String>,
    pub family: Option<String>,
    pub social: Option<String>,
    pub systems_review: Option<String>,
}

pub(crate) async fn upsert_in(
    conn: &mut SqliteConnection,
    visit_id: i64,
    input: &HistoryInput,
    actor: Option<i64>,
) -> ClinicResult<History> {
    sqlx::query_as::<_, History>(
        r#"
        INSERT INTO history (visit_id, past, drug_and_treatment, family, social,
                             systems_review, last_updated_by)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT (visit_id) DO UPDATE SET
            past = excluded.past,
            drug_and_treatment = excluded.drug_and_treatment,
            family = excluded.family,
            social = excluded.social,
            systems_review = excluded.systems_review,
            last_updated_by = excluded.last_updated_by,
            last_updated_at = CURRENT_TIMESTAMP
        RETURNING *
        "#,
    )
    .bind(visit_id)
    .bind(input.past.as_deref())
    .bind(input.drug_and_treatment.as_deref())
    .bind(input.family.as_deref())
    .bind(input.social.as_deref())
    .bind(input.systems_review.as_deref())
    .bind(actor)
    .fetch_one(&mut *conn)
    .await
    .map_err(ClinicError::record_write)
}

pub(crate) async fn get_in(
    conn: &mut SqliteConnection,
    visit_id: i64,
) -> ClinicResult<Option<History>> {
    let row = sqlx::query_as::<_, History>("SELECT * FROM history WHERE visit_id = ?1")
        .bind(visit_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}
