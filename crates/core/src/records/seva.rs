//! SEVA vision-referral assessment for a visit.
//!
//! Distinct from the general visual acuity record: SEVA captures the
//! re-tested readings and diagnosis used when referring to the SEVA eye
//! programme.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use utoipa::ToSchema;

use crate::{ClinicError, ClinicResult};

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct Seva {
    pub id: i64,
    pub visit_id: i64,
    pub left_with_pinhole_new: Option<String>,
    pub right_with_pinhole_new: Option<String>,
    pub left_without_pinhole_new: Option<String>,
    pub right_without_pinhole_new: Option<String>,
    pub diagnosis: Option<String>,
    pub date_of_referral: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub last_updated_at: NaiveDateTime,
    pub last_updated_by: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SevaInput {
    pub left_with_pinhole_new: Option<String>,
    pub right_with_pinhole_new: Option<String>,
    pub left_without_pinhole_new: Option<String>,
    pub right_without_pinhole_new: Option<String>,
    pub diagnosis: Option<String>,
    pub date_of_referral: Option<NaiveDate>,
    pub notes: Option<String>,
}

pub(crate) async fn upsert_in(
    conn: &mut SqliteConnection,
    visit_id: i64,
    input: &SevaInput,
    actor: Option<i64>,
) -> ClinicResult<Seva> {
    sqlx::query_as::<_, Seva>(
        r#"
        INSERT INTO seva (visit_id, left_with_pinhole_new, right_with_pinhole_new,
                          left_without_pinhole_new, right_without_pinhole_new,
                          diagnosis, date_of_referral, notes, last_updated_by)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT (visit_id) DO UPDATE SET
            left_with_pinhole_new = excluded.left_with_pinhole_new,
            right_with_pinhole_new = excluded.right_with_pinhole_new,
            left_without_pinhole_new = excluded.left_without_pinhole_new,
            right_without_pinhole_new = excluded.right_without_pinhole_new,
            diagnosis = excluded.diagnosis,
            date_of_referral = excluded.date_of_referral,
            notes = excluded.notes,
            last_updated_by = excluded.last_updated_by,
            last_updated_at = CURRENT_TIMESTAMP
        RETURNING *
        "#,
    )
    .bind(visit_id)
    .bind(input.left_with_pinhole_new.as_deref())
    .bind(input.right_with_pinhole_new.as_deref())
    .bind(input.left_without_pinhole_new.as_deref())
    .bind(input.right_without_pinhole_new.as_deref())
    .bind(input.diagnosis.as_deref())
    .bind(input.date_of_referral)
    .bind(input.notes.as_deref())
    .bind(actor)
    .fetch_one(&mut *conn)
    .await
    .map_err(ClinicError::record_write)
}

pub(crate) async fn get_in(
    conn: &mut SqliteConnection,
    visit_id: i64,
) -> ClinicResult<Option<Seva>> {
    let row = sqlx::query_as::<_, Seva>("SELECT * FROM seva WHERE visit_id = ?1")
        .bind(visit_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}
