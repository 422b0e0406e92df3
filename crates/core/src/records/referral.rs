//! Referrals to partner facilities.
//!
//! Unlike the per-visit upsert records, referrals are an append-only
//! collection: a visit can accumulate several, each with its own identity,
//! updated in place by id. They are also discoverable through the owning
//! consultation for older clients.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use utoipa::ToSchema;

use crate::{ClinicError, ClinicResult};

/// The closed set of facilities a referral can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferralType {
    MongkolBoreyHospital,
    Optometrist,
    Dentist,
    PoipetReferralHospital,
    BongBondol,
    Seva,
    WsAudiology,
}

impl ReferralType {
    pub const ALL: [ReferralType; 7] = [
        ReferralType::MongkolBoreyHospital,
        ReferralType::Optometrist,
        ReferralType::Dentist,
        ReferralType::PoipetReferralHospital,
        ReferralType::BongBondol,
        ReferralType::Seva,
        ReferralType::WsAudiology,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReferralType::MongkolBoreyHospital => "MongKol Borey Hospital",
            ReferralType::Optometrist => "Optometrist",
            ReferralType::Dentist => "Dentist",
            ReferralType::PoipetReferralHospital => "Poipet Referral Hospital",
            ReferralType::BongBondol => "Bong Bondol",
            ReferralType::Seva => "SEVA",
            ReferralType::WsAudiology => "WSAudiology",
        }
    }

    /// Parse a facility name, rejecting anything outside the closed set.
    pub fn parse(raw: &str) -> ClinicResult<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == raw)
            .ok_or_else(|| ClinicError::Validation(format!("invalid referral_type: {raw:?}")))
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct Referral {
    pub id: i64,
    pub visit_id: i64,
    pub doctor_id: Option<i64>,
    pub consultation_id: Option<i64>,
    pub referral_date: NaiveDate,
    pub referral_type: String,
    pub illness: Option<String>,
    pub duration: Option<String>,
    pub reason: Option<String>,
    pub created_at: NaiveDateTime,
    pub last_updated_at: NaiveDateTime,
    pub last_updated_by: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ReferralInput {
    pub visit_id: Option<i64>,
    pub consultation_id: Option<i64>,
    pub referral_date: Option<NaiveDate>,
    pub referral_type: Option<String>,
    pub illness: Option<String>,
    pub duration: Option<String>,
    pub reason: Option<String>,
}

impl ReferralInput {
    fn validated(&self) -> ClinicResult<(NaiveDate, ReferralType)> {
        let date = self
            .referral_date
            .ok_or_else(|| ClinicError::Validation("referral_date is required".into()))?;
        let referral_type = ReferralType::parse(self.referral_type.as_deref().unwrap_or(""))?;
        Ok((date, referral_type))
    }
}

pub(crate) async fn create_in(
    conn: &mut SqliteConnection,
    input: &ReferralInput,
    actor: Option<i64>,
) -> ClinicResult<Referral> {
    let visit_id = input
        .visit_id
        .ok_or_else(|| ClinicError::Validation("visit_id is required".into()))?;
    let (date, referral_type) = input.validated()?;

    sqlx::query_as::<_, Referral>(
        r#"
        INSERT INTO referral (visit_id, doctor_id, consultation_id, referral_date,
                              referral_type, illness, duration, reason, last_updated_by)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?2)
        RETURNING *
        "#,
    )
    .bind(visit_id)
    .bind(actor)
    .bind(input.consultation_id)
    .bind(date)
    .bind(referral_type.as_str())
    .bind(input.illness.as_deref())
    .bind(input.duration.as_deref())
    .bind(input.reason.as_deref())
    .fetch_one(&mut *conn)
    .await
    .map_err(ClinicError::record_write)
}

pub(crate) async fn update_in(
    conn: &mut SqliteConnection,
    referral_id: i64,
    input: &ReferralInput,
    actor: Option<i64>,
) -> ClinicResult<Referral> {
    let (date, referral_type) = input.validated()?;

    sqlx::query_as::<_, Referral>(
        r#"
        UPDATE referral
           SET referral_date = ?1,
               referral_type = ?2,
               illness = ?3,
               duration = ?4,
               reason = ?5,
               last_updated_by = ?6,
               last_updated_at = CURRENT_TIMESTAMP
         WHERE id = ?7
        RETURNING *
        "#,
    )
    .bind(date)
    .bind(referral_type.as_str())
    .bind(input.illness.as_deref())
    .bind(input.duration.as_deref())
    .bind(input.reason.as_deref())
    .bind(actor)
    .bind(referral_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(ClinicError::NotFound("referral"))
}

pub(crate) async fn list_by_visit_in(
    conn: &mut SqliteConnection,
    visit_id: i64,
) -> ClinicResult<Vec<Referral>> {
    let rows = sqlx::query_as::<_, Referral>(
        "SELECT * FROM referral WHERE visit_id = ?1 ORDER BY created_at ASC, id ASC",
    )
    .bind(visit_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

pub(crate) async fn list_by_consultation_in(
    conn: &mut SqliteConnection,
    consultation_id: i64,
) -> ClinicResult<Vec<Referral>> {
    let rows = sqlx::query_as::<_, Referral>(
        "SELECT * FROM referral WHERE consultation_id = ?1 ORDER BY created_at ASC, id ASC",
    )
    .bind(consultation_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}
