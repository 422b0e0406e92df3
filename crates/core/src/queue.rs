//! Queue tokens and the walk-in queue.
//!
//! A queue token is the alphanumeric slip handed to a patient on arrival:
//! one or more digits followed by optional letters (`2`, `2A`, `102B`).
//! Tokens are normalised (trimmed, upper-cased) before they touch the
//! database, and the owning patient row carries a denormalised mirror of
//! its most recent visit's token for fast lookup.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use sqlx::sqlite::SqlitePool;
use sqlx::SqliteConnection;
use utoipa::ToSchema;

use crate::visit::Visit;
use crate::{ClinicError, ClinicResult};

/// A normalised, validated queue token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueToken(String);

impl QueueToken {
    /// Normalise and validate a raw token.
    ///
    /// Trims whitespace and upper-cases ASCII letters, then requires one or
    /// more digits followed by zero or more letters. Everything else,
    /// including the empty string, is rejected.
    pub fn parse(raw: &str) -> ClinicResult<Self> {
        let token = raw.trim().to_ascii_uppercase();
        if token.is_empty() {
            return Err(ClinicError::Validation(
                "queue_no is required (e.g. \"2A\", \"3\")".into(),
            ));
        }

        let digits = token.bytes().take_while(u8::is_ascii_digit).count();
        let tail_ok = token.bytes().skip(digits).all(|b| b.is_ascii_uppercase());
        if digits == 0 || !tail_ok {
            return Err(ClinicError::Validation(format!(
                "queue_no must be digits followed by optional letters, got {token:?}"
            )));
        }

        Ok(Self(token))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for QueueToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of the walk-in queue for a location and date.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct QueueEntry {
    pub visit_id: i64,
    pub patient_id: i64,
    pub queue_no: String,
    pub english_name: String,
    pub khmer_name: Option<String>,
    pub sex: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub location_name: String,
    pub arrived_at: NaiveDateTime,
}

/// Queue-number assignment and queue reads.
#[derive(Clone)]
pub struct QueueService {
    pool: SqlitePool,
}

impl QueueService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Assign a queue token to an existing visit and mirror it onto the
    /// owning patient.
    ///
    /// Both writes must succeed before this returns; if the mirror write
    /// fails the operation is reported as failed even though the visit row
    /// changed, and the caller should retry.
    ///
    /// # Errors
    ///
    /// - `Validation` if the token does not normalise
    /// - `NotFound` if the visit does not exist
    /// - `DuplicateQueueEntry` if another visit at the same location and
    ///   date already holds the token
    pub async fn set_visit_queue_no(
        &self,
        visit_id: i64,
        raw_token: &str,
        actor: Option<i64>,
    ) -> ClinicResult<Visit> {
        let token = QueueToken::parse(raw_token)?;
        let mut conn = self.pool.acquire().await?;

        let visit = sqlx::query_as::<_, Visit>(
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
        .bind(visit_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(ClinicError::queue_conflict)?
        .ok_or(ClinicError::NotFound("visit"))?;

        mirror_queue_no_in(&mut conn, visit.patient_id, token.as_str(), actor).await?;

        Ok(visit)
    }

    /// All visits for a location and date, joined to patient and location.
    ///
    /// Ordered by the queue token treated as text, then patient name, so
    /// `10A` sorts before `2A`; callers needing numeric ordering must pad
    /// or parse the token themselves.
    pub async fn by_location_and_date(
        &self,
        location_id: i64,
        date: NaiveDate,
    ) -> ClinicResult<Vec<QueueEntry>> {
        let entries = sqlx::query_as::<_, QueueEntry>(
            r#"
            SELECT v.id AS visit_id,
                   p.id AS patient_id,
                   v.queue_no,
                   p.english_name,
                   p.khmer_name,
                   p.sex,
                   p.date_of_birth,
                   l.name AS location_name,
                   v.created_at AS arrived_at
              FROM visits v
              JOIN patients p ON p.id = v.patient_id
              JOIN locations l ON l.id = v.location_id
             WHERE v.location_id = ?1 AND v.visit_date = ?2
             ORDER BY v.queue_no ASC, p.english_name ASC
            "#,
        )
        .bind(location_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

/// Update the patient-side mirror of a queue token.
pub(crate) async fn mirror_queue_no_in(
    conn: &mut SqliteConnection,
    patient_id: i64,
    token: &str,
    actor: Option<i64>,
) -> ClinicResult<()> {
    sqlx::query(
        r#"
        UPDATE patients
           SET queue_no = ?1,
               last_updated_at = CURRENT_TIMESTAMP,
               last_updated_by = ?2
         WHERE id = ?3
        "#,
    )
    .bind(token)
    .bind(actor)
    .bind(patient_id)
    .execute(conn)
    .await?;

    Ok(())
}

#[cfg(test)]
mod queue_token_tests {
    use super::*;

    #[test]
    fn normalises_case_and_whitespace() {
        for raw in ["2a", " 2A ", "2A"] {
            assert_eq!(QueueToken::parse(raw).unwrap().as_str(), "2A");
        }
        assert_eq!(QueueToken::parse("102b").unwrap().as_str(), "102B");
        assert_eq!(QueueToken::parse("7").unwrap().as_str(), "7");
    }

    #[test]
    fn rejects_malformed_tokens() {
        for raw in ["A2", "2-A", "", "  ", "2A3", "a", "2 A"] {
            let err = QueueToken::parse(raw).expect_err("expected rejection");
            assert!(matches!(err, ClinicError::Validation(_)), "{raw:?}");
        }
    }
}

#[cfg(test)]
mod queue_service_tests {
    use super::*;
    use crate::db::connect_in_memory;
    use crate::testing;

    #[tokio::test]
    async fn assignment_mirrors_onto_patient() {
        let pool = connect_in_memory().await.unwrap();
        let location = testing::seed_location(&pool, "Poipet").await;
        let patient = testing::seed_patient(&pool, location, "Alice").await;
        let visit = testing::seed_visit(&pool, patient, location, "2026-03-01", "1").await;

        let service = QueueService::new(pool.clone());
        let updated = service.set_visit_queue_no(visit, "4b", None).await.unwrap();
        assert_eq!(updated.queue_no, "4B");

        let mirror: Option<String> =
            sqlx::query_scalar("SELECT queue_no FROM patients WHERE id = ?1")
                .bind(patient)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(mirror.as_deref(), Some("4B"));
    }

    #[tokio::test]
    async fn assignment_conflicts_with_existing_holder() {
        let pool = connect_in_memory().await.unwrap();
        let location = testing::seed_location(&pool, "Poipet").await;
        let alice = testing::seed_patient(&pool, location, "Alice").await;
        let bora = testing::seed_patient(&pool, location, "Bora").await;
        testing::seed_visit(&pool, alice, location, "2026-03-01", "2A").await;
        let visit = testing::seed_visit(&pool, bora, location, "2026-03-01", "3").await;

        let service = QueueService::new(pool.clone());
        let err = service
            .set_visit_queue_no(visit, "2a", None)
            .await
            .expect_err("expected conflict");
        assert!(matches!(err, ClinicError::DuplicateQueueEntry));
    }

    #[tokio::test]
    async fn queue_read_orders_by_token_text_then_name() {
        let pool = connect_in_memory().await.unwrap();
        let location = testing::seed_location(&pool, "Poipet").await;
        let a = testing::seed_patient(&pool, location, "Alice").await;
        let b = testing::seed_patient(&pool, location, "Bora").await;
        let c = testing::seed_patient(&pool, location, "Chan").await;
        testing::seed_visit(&pool, a, location, "2026-03-01", "2A").await;
        testing::seed_visit(&pool, b, location, "2026-03-01", "10A").await;
        testing::seed_visit(&pool, c, location, "2026-03-01", "2").await;

        let service = QueueService::new(pool.clone());
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let entries = service.by_location_and_date(location, date).await.unwrap();
        let tokens: Vec<&str> = entries.iter().map(|e| e.queue_no.as_str()).collect();
        // Text ordering: "10A" < "2" < "2A".
        assert_eq!(tokens, vec!["10A", "2", "2A"]);
    }
}
