//! Composite registration: patient + visit + triage records in one
//! transaction.
//!
//! Everything happens on one checked-out connection inside BEGIN/COMMIT;
//! any child failure — including a queue uniqueness conflict — rolls the
//! whole thing back, so a failed registration never leaves an orphan
//! patient behind.

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;
use utoipa::ToSchema;

use crate::patient::{self, NewPatient, Patient, PatientUpdate};
use crate::queue;
use crate::records::hef::{self, Hef, HefInput};
use crate::records::vitals::{self, Vitals, VitalsInput};
use crate::visit::{self, Visit, VisitRequest};
use crate::{ClinicError, ClinicResult};

/// Body of a composite registration.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegistrationRequest {
    pub patient: NewPatient,
    pub visit: Option<VisitRequest>,
    pub vitals: Option<VitalsInput>,
    pub hef: Option<HefInput>,
}

/// Body of a composite update for an existing patient.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RegistrationUpdateRequest {
    pub patient: Option<PatientUpdate>,
    pub visit: Option<VisitRequest>,
    pub vitals: Option<VitalsInput>,
    pub hef: Option<HefInput>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegistrationOutcome {
    pub patient: Patient,
    pub visit: Option<Visit>,
    pub vitals: Option<Vitals>,
    pub hef: Option<Hef>,
}

#[derive(Clone)]
pub struct RegistrationService {
    pool: SqlitePool,
}

impl RegistrationService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a patient and, optionally, its visit and triage records.
    ///
    /// Vitals and HEF are keyed by visit, so supplying either without
    /// visit data is a validation failure. When a visit is created the
    /// queue token is mirrored onto the new patient before commit.
    pub async fn register(
        &self,
        request: &RegistrationRequest,
        actor: Option<i64>,
    ) -> ClinicResult<RegistrationOutcome> {
        if request.visit.is_none() && (request.vitals.is_some() || request.hef.is_some()) {
            return Err(ClinicError::Validation(
                "vitals/hef require visit data".into(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let mut patient = patient::create_in(&mut tx, &request.patient, actor).await?;

        let mut visit_row = None;
        let mut vitals_row = None;
        let mut hef_row = None;

        if let Some(visit_request) = &request.visit {
            let visit = visit::resolve_in(&mut tx, patient.id, visit_request, actor).await?;

            if let Some(input) = &request.vitals {
                vitals_row = Some(vitals::upsert_in(&mut tx, visit.id, input, actor).await?);
            }
            if let Some(input) = &request.hef {
                hef_row = Some(hef::upsert_in(&mut tx, visit.id, input, actor).await?);
            }

            queue::mirror_queue_no_in(&mut tx, patient.id, &visit.queue_no, actor).await?;
            patient.queue_no = Some(visit.queue_no.clone());
            visit_row = Some(visit);
        }

        tx.commit().await?;

        Ok(RegistrationOutcome {
            patient,
            visit: visit_row,
            vitals: vitals_row,
            hef: hef_row,
        })
    }

    /// Composite update of an existing patient, mirroring [`register`].
    ///
    /// An existing visit for (patient, location, date) has its queue token
    /// reassigned; otherwise a new visit is created.
    ///
    /// [`register`]: RegistrationService::register
    pub async fn update(
        &self,
        patient_id: i64,
        request: &RegistrationUpdateRequest,
        actor: Option<i64>,
    ) -> ClinicResult<RegistrationOutcome> {
        if request.visit.is_none() && (request.vitals.is_some() || request.hef.is_some()) {
            return Err(ClinicError::Validation(
                "vitals/hef require visit data".into(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let mut patient = match &request.patient {
            Some(update) => patient::update_in(&mut tx, patient_id, update, actor).await?,
            None => sqlx::query_as::<_, Patient>("SELECT * FROM patients WHERE id = ?1")
                .bind(patient_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(ClinicError::NotFound("patient"))?,
        };

        let mut visit_row = None;
        let mut vitals_row = None;
        let mut hef_row = None;

        if let Some(visit_request) = &request.visit {
            let visit = visit::upsert_for_day_in(&mut tx, patient_id, visit_request, actor).await?;

            if let Some(input) = &request.vitals {
                vitals_row = Some(vitals::upsert_in(&mut tx, visit.id, input, actor).await?);
            }
            if let Some(input) = &request.hef {
                hef_row = Some(hef::upsert_in(&mut tx, visit.id, input, actor).await?);
            }

            queue::mirror_queue_no_in(&mut tx, patient_id, &visit.queue_no, actor).await?;
            patient.queue_no = Some(visit.queue_no.clone());
            visit_row = Some(visit);
        }

        tx.commit().await?;

        Ok(RegistrationOutcome {
            patient,
            visit: visit_row,
            vitals: vitals_row,
            hef: hef_row,
        })
    }
}

#[cfg(test)]
mod registration_tests {
    use super::*;
    use chrono::NaiveDate;
    use crate::db::connect_in_memory;
    use crate::testing;

    fn alice(location: i64) -> NewPatient {
        NewPatient {
            english_name: Some("Alice".into()),
            sex: Some("female".into()),
            location_id: Some(location),
            ..Default::default()
        }
    }

    fn visit_request(location: i64, token: &str) -> VisitRequest {
        VisitRequest {
            location_id: location,
            visit_date: NaiveDate::from_ymd_opt(2026, 3, 1),
            queue_no: Some(token.into()),
        }
    }

    #[tokio::test]
    async fn registers_patient_with_visit_and_triage_records() {
        let pool = connect_in_memory().await.unwrap();
        let location = testing::seed_location(&pool, "Poipet").await;

        let service = RegistrationService::new(pool.clone());
        let outcome = service
            .register(
                &RegistrationRequest {
                    patient: alice(location),
                    visit: Some(visit_request(location, "2a")),
                    vitals: Some(VitalsInput {
                        height: Some(160.0),
                        weight: Some(52.0),
                        ..Default::default()
                    }),
                    hef: Some(HefInput {
                        know_of_hef: Some(true),
                        has_hef: Some(false),
                        notes: None,
                    }),
                },
                None,
            )
            .await
            .unwrap();

        assert_eq!(outcome.patient.queue_no.as_deref(), Some("2A"));
        let visit = outcome.visit.expect("visit created");
        assert_eq!(visit.queue_no, "2A");
        assert!(outcome.vitals.is_some());
        assert!(outcome.hef.is_some());

        // Mirror is persisted, not just echoed.
        let mirror: Option<String> =
            sqlx::query_scalar("SELECT queue_no FROM patients WHERE id = ?1")
                .bind(outcome.patient.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(mirror.as_deref(), Some("2A"));
    }

    #[tokio::test]
    async fn queue_conflict_rolls_back_the_whole_registration() {
        let pool = connect_in_memory().await.unwrap();
        let location = testing::seed_location(&pool, "Poipet").await;
        let holder = testing::seed_patient(&pool, location, "Bora").await;
        testing::seed_visit(&pool, holder, location, "2026-03-01", "2A").await;

        let service = RegistrationService::new(pool.clone());
        let err = service
            .register(
                &RegistrationRequest {
                    patient: alice(location),
                    visit: Some(visit_request(location, "2A")),
                    vitals: None,
                    hef: None,
                },
                None,
            )
            .await
            .expect_err("expected conflict");
        assert!(matches!(err, ClinicError::DuplicateQueueEntry));

        // No orphan patient row survives the rollback.
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM patients WHERE english_name = 'Alice'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn triage_records_without_visit_are_rejected() {
        let pool = connect_in_memory().await.unwrap();
        let location = testing::seed_location(&pool, "Poipet").await;

        let service = RegistrationService::new(pool.clone());
        let err = service
            .register(
                &RegistrationRequest {
                    patient: alice(location),
                    visit: None,
                    vitals: Some(VitalsInput {
                        height: Some(160.0),
                        weight: Some(52.0),
                        ..Default::default()
                    }),
                    hef: None,
                },
                None,
            )
            .await
            .expect_err("expected validation failure");
        assert!(matches!(err, ClinicError::Validation(_)));
    }

    #[tokio::test]
    async fn update_reassigns_the_existing_visit_token() {
        let pool = connect_in_memory().await.unwrap();
        let location = testing::seed_location(&pool, "Poipet").await;
        let patient = testing::seed_patient(&pool, location, "Alice").await;
        let visit = testing::seed_visit(&pool, patient, location, "2026-03-01", "2A").await;

        let service = RegistrationService::new(pool.clone());
        let outcome = service
            .update(
                patient,
                &RegistrationUpdateRequest {
                    visit: Some(visit_request(location, "5")),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();

        let updated = outcome.visit.expect("visit updated");
        assert_eq!(updated.id, visit);
        assert_eq!(updated.queue_no, "5");
        assert_eq!(outcome.patient.queue_no.as_deref(), Some("5"));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM visits")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn re_registration_with_identical_key_is_idempotent() {
        let pool = connect_in_memory().await.unwrap();
        let location = testing::seed_location(&pool, "Poipet").await;
        let patient = testing::seed_patient(&pool, location, "Alice").await;
        let visit = testing::seed_visit(&pool, patient, location, "2026-03-01", "2A").await;

        let service = RegistrationService::new(pool.clone());
        let outcome = service
            .update(
                patient,
                &RegistrationUpdateRequest {
                    visit: Some(visit_request(location, "2a")),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();

        assert_eq!(outcome.visit.map(|v| v.id), Some(visit));
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM visits")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
