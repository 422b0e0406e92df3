//! Patient registry.
//!
//! Straight CRUD over the patients table. Partial updates are
//! COALESCE-merges: only supplied fields overwrite, and the audit columns
//! always advance. The composite registration flow that creates a patient
//! together with a visit and triage records lives in
//! [`crate::registration`].

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;
use sqlx::SqliteConnection;
use utoipa::ToSchema;

use crate::{ClinicError, ClinicResult};

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct Patient {
    pub id: i64,
    pub face_id: Option<String>,
    pub english_name: String,
    pub khmer_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub sex: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub location_id: i64,
    /// Mirror of the most recent visit's queue token; not authoritative.
    pub queue_no: Option<String>,
    pub created_at: NaiveDateTime,
    pub last_updated_at: NaiveDateTime,
    pub last_updated_by: Option<i64>,
}

/// A patient joined to its home location's name.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct PatientWithLocation {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub patient: Patient,
    pub location_name: Option<String>,
}

/// Fields for patient creation. `english_name` and `location_id` are
/// mandatory.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct NewPatient {
    pub face_id: Option<String>,
    pub english_name: Option<String>,
    pub khmer_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub sex: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub location_id: Option<i64>,
}

/// Partial update: omitted fields retain their previous values.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PatientUpdate {
    pub face_id: Option<String>,
    pub english_name: Option<String>,
    pub khmer_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub sex: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub location_id: Option<i64>,
}

/// A lightweight row of a patient's visit list, with presence flags for
/// the sections that have data.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct VisitSummary {
    pub visit_id: i64,
    pub queue_no: String,
    pub visit_date: NaiveDate,
    pub last_updated_at: NaiveDateTime,
    pub location_name: Option<String>,
    pub has_vitals: bool,
    pub has_presenting_complaint: bool,
    pub has_seva: bool,
    pub has_physiotherapy: bool,
    pub has_consultation: bool,
}

/// A patient with its visit list.
#[derive(Debug, Serialize, ToSchema)]
pub struct PatientDetail {
    pub patient: PatientWithLocation,
    pub visits: Vec<VisitSummary>,
}

#[derive(Clone)]
pub struct PatientService {
    pool: SqlitePool,
}

impl PatientService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new: &NewPatient, actor: Option<i64>) -> ClinicResult<Patient> {
        let mut conn = self.pool.acquire().await?;
        create_in(&mut conn, new, actor).await
    }

    pub async fn get(&self, id: i64) -> ClinicResult<Option<Patient>> {
        let patient = sqlx::query_as::<_, Patient>("SELECT * FROM patients WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(patient)
    }

    /// Patient plus its visit list with section presence flags.
    pub async fn detail(&self, id: i64) -> ClinicResult<PatientDetail> {
        let patient = sqlx::query_as::<_, PatientWithLocation>(
            r#"
            SELECT p.*, l.name AS location_name
              FROM patients p
              LEFT JOIN locations l ON l.id = p.location_id
             WHERE p.id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ClinicError::NotFound("patient"))?;

        let visits = sqlx::query_as::<_, VisitSummary>(
            r#"
            SELECT v.id AS visit_id,
                   v.queue_no,
                   v.visit_date,
                   v.last_updated_at,
                   l.name AS location_name,
                   EXISTS (SELECT 1 FROM vitals vt WHERE vt.visit_id = v.id) AS has_vitals,
                   EXISTS (SELECT 1 FROM presenting_complaint pc WHERE pc.visit_id = v.id) AS has_presenting_complaint,
                   EXISTS (SELECT 1 FROM seva s WHERE s.visit_id = v.id) AS has_seva,
                   EXISTS (SELECT 1 FROM physiotherapy pt WHERE pt.visit_id = v.id) AS has_physiotherapy,
                   EXISTS (SELECT 1 FROM consultation c WHERE c.visit_id = v.id) AS has_consultation
              FROM visits v
              LEFT JOIN locations l ON l.id = v.location_id
             WHERE v.patient_id = ?1
             ORDER BY v.visit_date DESC, v.created_at DESC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(PatientDetail { patient, visits })
    }

    pub async fn update(
        &self,
        id: i64,
        update: &PatientUpdate,
        actor: Option<i64>,
    ) -> ClinicResult<Patient> {
        let mut conn = self.pool.acquire().await?;
        update_in(&mut conn, id, update, actor).await
    }

    /// Delete a patient; visits and every attached clinical record go with
    /// it.
    pub async fn delete(&self, id: i64) -> ClinicResult<()> {
        let result = sqlx::query("DELETE FROM patients WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ClinicError::NotFound("patient"));
        }
        Ok(())
    }

    pub async fn by_location(&self, location_id: i64) -> ClinicResult<Vec<PatientWithLocation>> {
        let rows = sqlx::query_as::<_, PatientWithLocation>(
            r#"
            SELECT p.*, l.name AS location_name
              FROM patients p
              JOIN locations l ON l.id = p.location_id
             WHERE p.location_id = ?1
             ORDER BY p.english_name ASC
            "#,
        )
        .bind(location_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Patients at a location addressed by its unique name.
    pub async fn by_location_name(&self, name: &str) -> ClinicResult<Vec<PatientWithLocation>> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClinicError::Validation("location name is required".into()));
        }

        let rows = sqlx::query_as::<_, PatientWithLocation>(
            r#"
            SELECT p.*, l.name AS location_name
              FROM patients p
              JOIN locations l ON l.id = p.location_id
             WHERE l.name = ?1
             ORDER BY p.english_name ASC
            "#,
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Name search over English and Khmer names, bounded to 10 rows.
    pub async fn search(&self, term: &str) -> ClinicResult<Vec<Patient>> {
        let term = term.trim();
        if term.is_empty() {
            return Err(ClinicError::Validation("search term is required".into()));
        }

        let pattern = format!("%{term}%");
        let rows = sqlx::query_as::<_, Patient>(
            r#"
            SELECT * FROM patients
             WHERE english_name LIKE ?1 OR khmer_name LIKE ?1
             LIMIT 10
            "#,
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

pub(crate) async fn create_in(
    conn: &mut SqliteConnection,
    new: &NewPatient,
    actor: Option<i64>,
) -> ClinicResult<Patient> {
    let english_name = new
        .english_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ClinicError::Validation("patient.english_name is required".into()))?;
    let location_id = new
        .location_id
        .ok_or_else(|| ClinicError::Validation("patient.location_id is required".into()))?;

    sqlx::query_as::<_, Patient>(
        r#"
        INSERT INTO patients (face_id, english_name, khmer_name, date_of_birth, sex,
                              phone_number, address, location_id, last_updated_by)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        RETURNING *
        "#,
    )
    .bind(new.face_id.as_deref())
    .bind(english_name)
    .bind(new.khmer_name.as_deref())
    .bind(new.date_of_birth)
    .bind(new.sex.as_deref())
    .bind(new.phone_number.as_deref())
    .bind(new.address.as_deref())
    .bind(location_id)
    .bind(actor)
    .fetch_one(&mut *conn)
    .await
    .map_err(|err| {
        if crate::error::is_foreign_key_violation(&err) {
            ClinicError::NotFound("location")
        } else {
            err.into()
        }
    })
}

pub(crate) async fn update_in(
    conn: &mut SqliteConnection,
    id: i64,
    update: &PatientUpdate,
    actor: Option<i64>,
) -> ClinicResult<Patient> {
    sqlx::query_as::<_, Patient>(
        r#"
        UPDATE patients
           SET face_id       = COALESCE(?1, face_id),
               english_name  = COALESCE(?2, english_name),
               khmer_name    = COALESCE(?3, khmer_name),
               date_of_birth = COALESCE(?4, date_of_birth),
               sex           = COALESCE(?5, sex),
               phone_number  = COALESCE(?6, phone_number),
               address       = COALESCE(?7, address),
               location_id   = COALESCE(?8, location_id),
               last_updated_by = ?9,
               last_updated_at = CURRENT_TIMESTAMP
         WHERE id = ?10
        RETURNING *
        "#,
    )
    .bind(update.face_id.as_deref())
    .bind(update.english_name.as_deref())
    .bind(update.khmer_name.as_deref())
    .bind(update.date_of_birth)
    .bind(update.sex.as_deref())
    .bind(update.phone_number.as_deref())
    .bind(update.address.as_deref())
    .bind(update.location_id)
    .bind(actor)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(ClinicError::NotFound("patient"))
}

#[cfg(test)]
mod patient_service_tests {
    use super::*;
    use crate::db::connect_in_memory;
    use crate::testing;

    #[tokio::test]
    async fn partial_update_preserves_unsupplied_fields() {
        let pool = connect_in_memory().await.unwrap();
        let location = testing::seed_location(&pool, "Poipet").await;
        let actor = testing::seed_user(&pool, "soklin").await;

        let service = PatientService::new(pool.clone());
        let created = service
            .create(
                &NewPatient {
                    english_name: Some("Alice".into()),
                    khmer_name: Some("អាលីស".into()),
                    date_of_birth: NaiveDate::from_ymd_opt(1990, 5, 4),
                    sex: Some("female".into()),
                    location_id: Some(location),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();

        let updated = service
            .update(
                created.id,
                &PatientUpdate {
                    phone_number: Some("012 345 678".into()),
                    ..Default::default()
                },
                Some(actor),
            )
            .await
            .unwrap();

        assert_eq!(updated.phone_number.as_deref(), Some("012 345 678"));
        assert_eq!(updated.english_name, "Alice");
        assert_eq!(updated.khmer_name.as_deref(), Some("អាលីស"));
        assert_eq!(updated.date_of_birth, NaiveDate::from_ymd_opt(1990, 5, 4));
        assert_eq!(updated.last_updated_by, Some(actor));
    }

    #[tokio::test]
    async fn create_requires_name_and_location() {
        let pool = connect_in_memory().await.unwrap();
        let service = PatientService::new(pool.clone());

        let err = service
            .create(
                &NewPatient {
                    english_name: Some("  ".into()),
                    location_id: Some(1),
                    ..Default::default()
                },
                None,
            )
            .await
            .expect_err("expected validation failure");
        assert!(matches!(err, ClinicError::Validation(_)));

        let err = service
            .create(
                &NewPatient {
                    english_name: Some("Alice".into()),
                    ..Default::default()
                },
                None,
            )
            .await
            .expect_err("expected validation failure");
        assert!(matches!(err, ClinicError::Validation(_)));
    }

    #[tokio::test]
    async fn delete_cascades_to_visits_and_records() {
        let pool = connect_in_memory().await.unwrap();
        let location = testing::seed_location(&pool, "Poipet").await;
        let patient = testing::seed_patient(&pool, location, "Alice").await;
        let visit = testing::seed_visit(&pool, patient, location, "2026-03-01", "1").await;

        let store = crate::records::RecordStore::new(pool.clone());
        store
            .upsert_vitals(
                visit,
                &crate::records::vitals::VitalsInput {
                    height: Some(150.0),
                    weight: Some(48.0),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();
        store
            .upsert_physiotherapy(
                visit,
                &crate::records::physiotherapy::PhysiotherapyInput {
                    notes: None,
                    painpoints: vec![crate::records::physiotherapy::PainpointInput {
                        x_coord: 0.5,
                        y_coord: 0.5,
                    }],
                },
                None,
            )
            .await
            .unwrap();
        store
            .create_referral(
                &crate::records::referral::ReferralInput {
                    visit_id: Some(visit),
                    referral_date: NaiveDate::from_ymd_opt(2026, 3, 1),
                    referral_type: Some("SEVA".into()),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();

        let service = PatientService::new(pool.clone());
        service.delete(patient).await.unwrap();

        for table in ["visits", "vitals", "physiotherapy", "painpoints", "referral"] {
            let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
                .fetch_one(&pool)
                .await
                .unwrap();
            assert_eq!(count, 0, "{table} should be empty after cascade");
        }
    }

    #[tokio::test]
    async fn listing_by_location_name_matches_listing_by_id() {
        let pool = connect_in_memory().await.unwrap();
        let location = testing::seed_location(&pool, "Poipet").await;
        testing::seed_patient(&pool, location, "Alice").await;

        let service = PatientService::new(pool.clone());
        let by_id = service.by_location(location).await.unwrap();
        let by_name = service.by_location_name("Poipet").await.unwrap();
        assert_eq!(by_id.len(), 1);
        assert_eq!(by_id[0].patient.id, by_name[0].patient.id);
        assert_eq!(by_name[0].location_name.as_deref(), Some("Poipet"));
    }

    #[tokio::test]
    async fn search_matches_either_name() {
        let pool = connect_in_memory().await.unwrap();
        let location = testing::seed_location(&pool, "Poipet").await;
        testing::seed_patient(&pool, location, "Alice").await;
        testing::seed_patient(&pool, location, "Bora").await;

        let service = PatientService::new(pool.clone());
        let hits = service.search("lic").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].english_name, "Alice");

        let err = service.search("  ").await.expect_err("expected validation");
        assert!(matches!(err, ClinicError::Validation(_)));
    }
}
