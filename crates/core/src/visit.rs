//! Visits and the get-or-create visit protocol.
//!
//! A visit is one dated encounter of a patient at a location, identified by
//! a queue token. The resolver is idempotent: re-submitting identical
//! registration data returns the visit that already exists instead of
//! creating a duplicate, and two near-simultaneous requests for the same
//! token race at the uniqueness constraint — the loser surfaces a
//! [`ClinicError::DuplicateQueueEntry`], never a silent overwrite.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;
use sqlx::SqliteConnection;
use utoipa::ToSchema;

use crate::queue::{self, QueueToken};
use crate::records::consultation::Consultation;
use crate::records::hef::Hef;
use crate::records::history::History;
use crate::records::physiotherapy::{self, PhysiotherapyDetail};
use crate::records::presenting_complaint::PresentingComplaint;
use crate::records::referral::{self, Referral};
use crate::records::seva::Seva;
use crate::records::visual_acuity::VisualAcuity;
use crate::records::vitals::Vitals;
use crate::records::{consultation, hef, history, presenting_complaint, seva, visual_acuity, vitals};
use crate::{ClinicError, ClinicResult};

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct Visit {
    pub id: i64,
    pub patient_id: i64,
    pub location_id: i64,
    pub visit_date: NaiveDate,
    pub queue_no: String,
    pub created_at: NaiveDateTime,
    pub last_updated_at: NaiveDateTime,
    pub last_updated_by: Option<i64>,
}

/// Visit data supplied by a registration or update request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct VisitRequest {
    pub location_id: i64,
    /// Defaults to the server's current calendar date when omitted.
    pub visit_date: Option<NaiveDate>,
    /// Mandatory: a visit without a queue assignment is meaningless in the
    /// clinic's workflow.
    pub queue_no: Option<String>,
}

impl VisitRequest {
    fn token(&self) -> ClinicResult<QueueToken> {
        QueueToken::parse(self.queue_no.as_deref().unwrap_or(""))
    }

    fn date(&self) -> NaiveDate {
        self.visit_date
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

/// The full clinical bundle for one visit.
#[derive(Debug, Serialize, ToSchema)]
pub struct VisitDetail {
    pub visit: Visit,
    pub location_name: Option<String>,
    pub vitals: Option<Vitals>,
    pub hef: Option<Hef>,
    pub visual_acuity: Option<VisualAcuity>,
    pub presenting_complaint: Option<PresentingComplaint>,
    pub history: Option<History>,
    pub seva: Option<Seva>,
    pub physiotherapy: Option<PhysiotherapyDetail>,
    pub consultation: Option<Consultation>,
    pub referrals: Vec<Referral>,
}

/// Get-or-create visit resolution.
#[derive(Clone)]
pub struct VisitResolver {
    pool: SqlitePool,
}

impl VisitResolver {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Locate or create the visit for (patient, location, date, token),
    /// mirroring the token onto the patient.
    ///
    /// # Errors
    ///
    /// - `Validation` if the queue token is missing or malformed
    /// - `NotFound` if the patient does not exist
    /// - `DuplicateQueueEntry` if the token is already held by another visit
    ///   at the same location and date
    pub async fn resolve(
        &self,
        patient_id: i64,
        request: &VisitRequest,
        actor: Option<i64>,
    ) -> ClinicResult<Visit> {
        let mut tx = self.pool.begin().await?;

        let known: Option<i64> = sqlx::query_scalar("SELECT id FROM patients WHERE id = ?1")
            .bind(patient_id)
            .fetch_optional(&mut *tx)
            .await?;
        if known.is_none() {
            return Err(ClinicError::NotFound("patient"));
        }

        let visit = resolve_in(&mut tx, patient_id, request, actor).await?;
        queue::mirror_queue_no_in(&mut tx, patient_id, &visit.queue_no, actor).await?;
        tx.commit().await?;

        Ok(visit)
    }

    pub async fn get(&self, visit_id: i64) -> ClinicResult<Option<Visit>> {
        let visit = sqlx::query_as::<_, Visit>("SELECT * FROM visits WHERE id = ?1")
            .bind(visit_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(visit)
    }

    /// Assemble the full clinical bundle for a visit.
    pub async fn detail(&self, visit_id: i64) -> ClinicResult<VisitDetail> {
        let mut conn = self.pool.acquire().await?;

        let visit = sqlx::query_as::<_, Visit>("SELECT * FROM visits WHERE id = ?1")
            .bind(visit_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(ClinicError::NotFound("visit"))?;

        let location_name: Option<String> =
            sqlx::query_scalar("SELECT name FROM locations WHERE id = ?1")
                .bind(visit.location_id)
                .fetch_optional(&mut *conn)
                .await?;

        let vitals = vitals::get_in(&mut conn, visit_id).await?;
        let hef = hef::get_in(&mut conn, visit_id).await?;
        let visual_acuity = visual_acuity::get_in(&mut conn, visit_id).await?;
        let presenting_complaint = presenting_complaint::get_in(&mut conn, visit_id).await?;
        let history = history::get_in(&mut conn, visit_id).await?;
        let seva = seva::get_in(&mut conn, visit_id).await?;
        let physiotherapy = physiotherapy::get_in(&mut conn, visit_id).await?;
        let consultation = consultation::get_in(&mut conn, visit_id).await?;
        let referrals = referral::list_by_visit_in(&mut conn, visit_id).await?;

        Ok(VisitDetail {
            visit,
            location_name,
            vitals,
            hef,
            visual_acuity,
            presenting_complaint,
            history,
            seva,
            physiotherapy,
            consultation,
            referrals,
        })
    }
}

/// Get-or-create a visit by its natural key inside an open transaction.
pub(crate) async fn resolve_in(
    conn: &mut SqliteConnection,
    patient_id: i64,
    request: &VisitRequest,
    actor: Option<i64>,
) -> ClinicResult<Visit> {
    let token = request.token()?;
    let date = request.date();

    let existing = sqlx::query_as::<_, Visit>(
        r#"
        SELECT * FROM visits
         WHERE patient_id = ?1 AND location_id = ?2 AND visit_date = ?3 AND queue_no = ?4
        "#,
    )
    .bind(patient_id)
    .bind(request.location_id)
    .bind(date)
    .bind(token.as_str())
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(visit) = existing {
        return Ok(visit);
    }

    sqlx::query_as::<_, Visit>(
        r#"
        INSERT INTO visits (patient_id, location_id, visit_date, queue_no, last_updated_by)
        VALUES (?1, ?2, ?3, ?4, ?5)
        RETURNING *
        "#,
    )
    .bind(patient_id)
    .bind(request.location_id)
    .bind(date)
    .bind(token.as_str())
    .bind(actor)
    .fetch_one(&mut *conn)
    .await
    .map_err(ClinicError::queue_conflict)
}

/// Target an existing-or-new visit for (patient, location, date) inside a
/// composite update.
///
/// A visit already holding the requested token is returned unchanged; an
/// existing visit for the day has its token reassigned; otherwise a new
/// visit row is inserted.
pub(crate) async fn upsert_for_day_in(
    conn: &mut SqliteConnection,
    patient_id: i64,
    request: &VisitRequest,
    actor: Option<i64>,
) -> ClinicResult<Visit> {
    let token = request.token()?;
    let date = request.date();

    let same_token = sqlx::query_as::<_, Visit>(
        r#"
        SELECT * FROM visits
         WHERE patient_id = ?1 AND location_id = ?2 AND visit_date = ?3 AND queue_no = ?4
        "#,
    )
    .bind(patient_id)
    .bind(request.location_id)
    .bind(date)
    .bind(token.as_str())
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(visit) = same_token {
        return Ok(visit);
    }

    let same_day = sqlx::query_as::<_, Visit>(
        r#"
        SELECT * FROM visits
         WHERE patient_id = ?1 AND location_id = ?2 AND visit_date = ?3
         ORDER BY id
         LIMIT 1
        "#,
    )
    .bind(patient_id)
    .bind(request.location_id)
    .bind(date)
    .fetch_optional(&mut *conn)
    .await?;

    match same_day {
        Some(visit) => sqlx::query_as::<_, Visit>(
            r#"
            UPDATE visits
               SET queue_no = ?1,
                   last_updated_at = CURRENT_TIMESTAMP,
                   last_updated_by = ?2
             WHERE id = ?3
            RETURNING *
            "#,
        )
        .bind(token.as_str())
        .bind(actor)
        .bind(visit.id)
        .fetch_one(&mut *conn)
        .await
        .map_err(ClinicError::queue_conflict),
        None => sqlx::query_as::<_, Visit>(
            r#"
            INSERT INTO visits (patient_id, location_id, visit_date, queue_no, last_updated_by)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING *
            "#,
        )
        .bind(patient_id)
        .bind(request.location_id)
        .bind(date)
        .bind(token.as_str())
        .bind(actor)
        .fetch_one(&mut *conn)
        .await
        .map_err(ClinicError::queue_conflict),
    }
}

#[cfg(test)]
mod visit_resolver_tests {
    use super::*;
    use crate::db::connect_in_memory;
    use crate::testing;

    fn request(location_id: i64, token: &str) -> VisitRequest {
        VisitRequest {
            location_id,
            visit_date: NaiveDate::from_ymd_opt(2026, 3, 1),
            queue_no: Some(token.to_string()),
        }
    }

    #[tokio::test]
    async fn resolution_is_idempotent() {
        let pool = connect_in_memory().await.unwrap();
        let location = testing::seed_location(&pool, "Poipet").await;
        let patient = testing::seed_patient(&pool, location, "Alice").await;

        let resolver = VisitResolver::new(pool.clone());
        let first = resolver
            .resolve(patient, &request(location, "2a"), None)
            .await
            .unwrap();
        let second = resolver
            .resolve(patient, &request(location, " 2A "), None)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.queue_no, "2A");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM visits")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn token_is_mandatory() {
        let pool = connect_in_memory().await.unwrap();
        let location = testing::seed_location(&pool, "Poipet").await;
        let patient = testing::seed_patient(&pool, location, "Alice").await;

        let resolver = VisitResolver::new(pool.clone());
        let mut req = request(location, "2");
        req.queue_no = None;
        let err = resolver
            .resolve(patient, &req, None)
            .await
            .expect_err("expected validation failure");
        assert!(matches!(err, ClinicError::Validation(_)));
    }

    #[tokio::test]
    async fn token_conflicts_across_patients() {
        let pool = connect_in_memory().await.unwrap();
        let location = testing::seed_location(&pool, "Poipet").await;
        let alice = testing::seed_patient(&pool, location, "Alice").await;
        let bora = testing::seed_patient(&pool, location, "Bora").await;

        let resolver = VisitResolver::new(pool.clone());
        resolver
            .resolve(alice, &request(location, "2A"), None)
            .await
            .unwrap();
        let err = resolver
            .resolve(bora, &request(location, "2a"), None)
            .await
            .expect_err("expected conflict");
        assert!(matches!(err, ClinicError::DuplicateQueueEntry));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM visits")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn unknown_patient_is_not_found() {
        let pool = connect_in_memory().await.unwrap();
        let location = testing::seed_location(&pool, "Poipet").await;

        let resolver = VisitResolver::new(pool.clone());
        let err = resolver
            .resolve(999, &request(location, "1"), None)
            .await
            .expect_err("expected not found");
        assert!(matches!(err, ClinicError::NotFound("patient")));
    }
}
