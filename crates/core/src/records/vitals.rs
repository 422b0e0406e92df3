//! Triage vitals for a visit.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use utoipa::ToSchema;

use crate::{ClinicError, ClinicResult};

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct Vitals {
    pub id: i64,
    pub visit_id: i64,
    pub height: f64,
    pub weight: f64,
    pub bmi: Option<f64>,
    pub below_3rd_percentile: Option<bool>,
    pub bp_systolic: Option<i64>,
    pub bp_diastolic: Option<i64>,
    pub temperature: Option<f64>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub last_updated_at: NaiveDateTime,
    pub last_updated_by: Option<i64>,
}

/// Submitted vitals. Height and weight are mandatory and must be
/// non-negative; everything else is optional.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct VitalsInput {
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub bmi: Option<f64>,
    pub below_3rd_percentile: Option<bool>,
    pub bp_systolic: Option<i64>,
    pub bp_diastolic: Option<i64>,
    pub temperature: Option<f64>,
    pub notes: Option<String>,
}

impl VitalsInput {
    fn validated(&self) -> ClinicResult<(f64, f64)> {
        let height = self
            .height
            .ok_or_else(|| ClinicError::Validation("vitals.height is required".into()))?;
        let weight = self
            .weight
            .ok_or_else(|| ClinicError::Validation("vitals.weight is required".into()))?;
        if height < 0.0 || weight < 0.0 {
            return Err(ClinicError::Validation(
                "vitals.height and vitals.weight must be non-negative".into(),
            ));
        }
        Ok((height, weight))
    }
}

pub(crate) async fn upsert_in(
    conn: &mut SqliteConnection,
    visit_id: i64,
    input: &VitalsInput,
    actor: Option<i64>,
) -> ClinicResult<Vitals> {
    let (height, weight) = input.validated()?;

    sqlx::query_as::<_, Vitals>(
        r#"
        INSERT INTO vitals (visit_id, height, weight, bmi, below_3rd_percentile,
                            bp_systolic, bp_diastolic, temperature, notes, last_updated_by)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ON CONFLICT (visit_id) DO UPDATE SET
            height = excluded.height,
            weight = excluded.weight,
            bmi = excluded.bmi,
            below_3rd_percentile = excluded.below_3rd_percentile,
            bp_systolic = excluded.bp_systolic,
            bp_diastolic = excluded.bp_diastolic,
            temperature = excluded.temperature,
            notes = excluded.notes,
            last_updated_by = excluded.last_updated_by,
            last_updated_at = CURRENT_TIMESTAMP
        RETURNING *
        "#,
    )
    .bind(visit_id)
    .bind(height)
    .bind(weight)
    .bind(input.bmi)
    .bind(input.below_3rd_percentile)
    .bind(input.bp_systolic)
    .bind(input.bp_diastolic)
    .bind(input.temperature)
    .bind(input.notes.as_deref())
    .bind(actor)
    .fetch_one(&mut *conn)
    .await
    .map_err(ClinicError::record_write)
}

pub(crate) async fn get_in(
    conn: &mut SqliteConnection,
    visit_id: i64,
) -> ClinicResult<Option<Vitals>> {
    let row = sqlx::query_as::<_, Vitals>("SELECT * FROM vitals WHERE visit_id = ?1")
        .bind(visit_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}
