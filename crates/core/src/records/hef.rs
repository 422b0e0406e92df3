//! Health Equity Fund awareness questionnaire for a visit.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use utoipa::ToSchema;

use crate::{ClinicError, ClinicResult};

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct Hef {
    pub id: i64,
    pub visit_id: i64,
    pub know_of_hef: bool,
    pub has_hef: bool,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub last_updated_at: NaiveDateTime,
    pub last_updated_by: Option<i64>,
}

/// Both booleans are mandatory.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct HefInput {
    pub know_of_hef: Option<bool>,
    pub has_hef: Option<bool>,
    pub notes: Option<String>,
}

impl HefInput {
    fn validated(&self) -> ClinicResult<(bool, bool)> {
        let know_of_hef = self
            .know_of_hef
            .ok_or_else(|| ClinicError::Validation("hef.know_of_hef is required".into()))?;
        let has_hef = self
            .has_hef
            .ok_or_else(|| ClinicError::Validation("hef.has_hef is required".into()))?;
        Ok((know_of_hef, has_hef))
    }
}

pub(crate) async fn upsert_in(
    conn: &mut SqliteConnection,
    visit_id: i64,
    input: &HefInput,
    actor: Option<i64>,
) -> ClinicResult<Hef> {
    let (know_of_hef, has_hef) = input.validated()?;

    sqlx::query_as::<_, Hef>(
        r#"
        INSERT INTO hef (visit_id, know_of_hef, has_hef, notes, last_updated_by)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT (visit_id) DO UPDATE SET
            know_of_hef = excluded.know_of_hef,
            has_hef = excluded.has_hef,
            notes = excluded.notes,
            last_updated_by = excluded.last_updated_by,
            last_updated_at = CURRENT_TIMESTAMP
        RETURNING *
        "#,
    )
    .bind(visit_id)
    .bind(know_of_hef)
    .bind(has_hef)
    .bind(input.notes.as_deref())
    .bind(actor)
    .fetch_one(&mut *conn)
    .await
    .map_err(ClinicError::record_write)
}

pub(crate) async fn get_in(
    conn: &mut SqliteConnection,
    visit_id: i64,
) -> ClinicResult<Option<Hef>> {
    let row = sqlx::query_as::<_, Hef>("SELECT * FROM hef WHERE visit_id = ?1")
        .bind(visit_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}
