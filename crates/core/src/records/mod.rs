//! Typed per-visit clinical records.
//!
//! One module per record kind. Every kind except referrals follows the
//! single-current-value-per-visit model: the first write for a visit
//! creates the row, every later write replaces it in place and bumps
//! `last_updated_at`/`last_updated_by`. This is deliberately not an audit
//! trail. Referrals are an append-only collection with their own identity.
//!
//! The `*_in` functions operate on an open connection so the registration
//! transaction can compose them; [`RecordStore`] wraps them for standalone
//! endpoint use.

pub mod consultation;
pub mod hef;
pub mod history;
pub mod physiotherapy;
pub mod presenting_complaint;
pub mod referral;
pub mod seva;
pub mod visual_acuity;
pub mod vitals;

use sqlx::sqlite::SqlitePool;

use crate::ClinicResult;

use consultation::{Consultation, ConsultationInput};
use hef::{Hef, HefInput};
use history::{History, HistoryInput};
use physiotherapy::{PhysiotherapyDetail, PhysiotherapyInput};
use presenting_complaint::{PresentingComplaint, PresentingComplaintInput};
use referral::{Referral, ReferralInput};
use seva::{Seva, SevaInput};
use visual_acuity::{VisualAcuity, VisualAcuityInput};
use vitals::{Vitals, VitalsInput};

/// Pool-level access to every clinical record kind.
#[derive(Clone)]
pub struct RecordStore {
    pool: SqlitePool,
}

impl RecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn upsert_vitals(
        &self,
        visit_id: i64,
        input: &VitalsInput,
        actor: Option<i64>,
    ) -> ClinicResult<Vitals> {
        let mut conn = self.pool.acquire().await?;
        vitals::upsert_in(&mut conn, visit_id, input, actor).await
    }

    pub async fn vitals(&self, visit_id: i64) -> ClinicResult<Option<Vitals>> {
        let mut conn = self.pool.acquire().await?;
        vitals::get_in(&mut conn, visit_id).await
    }

    pub async fn upsert_hef(
        &self,
        visit_id: i64,
        input: &HefInput,
        actor: Option<i64>,
    ) -> ClinicResult<Hef> {
        let mut conn = self.pool.acquire().await?;
        hef::upsert_in(&mut conn, visit_id, input, actor).await
    }

    pub async fn hef(&self, visit_id: i64) -> ClinicResult<Option<Hef>> {
        let mut conn = self.pool.acquire().await?;
        hef::get_in(&mut conn, visit_id).await
    }

    pub async fn upsert_visual_acuity(
        &self,
        visit_id: i64,
        input: &VisualAcuityInput,
        actor: Option<i64>,
    ) -> ClinicResult<VisualAcuity> {
        let mut conn = self.pool.acquire().await?;
        visual_acuity::upsert_in(&mut conn, visit_id, input, actor).await
    }

    pub async fn visual_acuity(&self, visit_id: i64) -> ClinicResult<Option<VisualAcuity>> {
        let mut conn = self.pool.acquire().await?;
        visual_acuity::get_in(&mut conn, visit_id).await
    }

    pub async fn upsert_presenting_complaint(
        &self,
        visit_id: i64,
        input: &PresentingComplaintInput,
        actor: Option<i64>,
    ) -> ClinicResult<PresentingComplaint> {
        let mut conn = self.pool.acquire().await?;
        presenting_complaint::upsert_in(&mut conn, visit_id, input, actor).await
    }

    pub async fn presenting_complaint(
        &self,
        visit_id: i64,
    ) -> ClinicResult<Option<PresentingComplaint>> {
        let mut conn = self.pool.acquire().await?;
        presenting_complaint::get_in(&mut conn, visit_id).await
    }

    pub async fn upsert_history(
        &self,
        visit_id: i64,
        input: &HistoryInput,
        actor: Option<i64>,
    ) -> ClinicResult<History> {
        let mut conn = self.pool.acquire().await?;
        history::upsert_in(&mut conn, visit_id, input, actor).await
    }

    pub async fn history(&self, visit_id: i64) -> ClinicResult<Option<History>> {
        let mut conn = self.pool.acquire().await?;
        history::get_in(&mut conn, visit_id).await
    }

    pub async fn upsert_consultation(
        &self,
        visit_id: i64,
        input: &ConsultationInput,
        actor: Option<i64>,
    ) -> ClinicResult<Consultation> {
        let mut conn = self.pool.acquire().await?;
        consultation::upsert_in(&mut conn, visit_id, input, actor).await
    }

    pub async fn consultation(&self, visit_id: i64) -> ClinicResult<Option<Consultation>> {
        let mut conn = self.pool.acquire().await?;
        consultation::get_in(&mut conn, visit_id).await
    }

    pub async fn upsert_seva(
        &self,
        visit_id: i64,
        input: &SevaInput,
        actor: Option<i64>,
    ) -> ClinicResult<Seva> {
        let mut conn = self.pool.acquire().await?;
        seva::upsert_in(&mut conn, visit_id, input, actor).await
    }

    pub async fn seva(&self, visit_id: i64) -> ClinicResult<Option<Seva>> {
        let mut conn = self.pool.acquire().await?;
        seva::get_in(&mut conn, visit_id).await
    }

    /// Upsert the physiotherapy record and replace its painpoint set.
    ///
    /// The delete-then-insert of painpoints runs inside one transaction so
    /// concurrent readers never observe an empty point set mid-update.
    pub async fn upsert_physiotherapy(
        &self,
        visit_id: i64,
        input: &PhysiotherapyInput,
        actor: Option<i64>,
    ) -> ClinicResult<PhysiotherapyDetail> {
        let mut tx = self.pool.begin().await?;
        let detail = physiotherapy::upsert_in(&mut tx, visit_id, input, actor).await?;
        tx.commit().await?;
        Ok(detail)
    }

    pub async fn physiotherapy(&self, visit_id: i64) -> ClinicResult<Option<PhysiotherapyDetail>> {
        let mut conn = self.pool.acquire().await?;
        physiotherapy::get_in(&mut conn, visit_id).await
    }

    pub async fn create_referral(
        &self,
        input: &ReferralInput,
        actor: Option<i64>,
    ) -> ClinicResult<Referral> {
        let mut conn = self.pool.acquire().await?;
        referral::create_in(&mut conn, input, actor).await
    }

    pub async fn update_referral(
        &self,
        referral_id: i64,
        input: &ReferralInput,
        actor: Option<i64>,
    ) -> ClinicResult<Referral> {
        let mut conn = self.pool.acquire().await?;
        referral::update_in(&mut conn, referral_id, input, actor).await
    }

    pub async fn referrals_by_visit(&self, visit_id: i64) -> ClinicResult<Vec<Referral>> {
        let mut conn = self.pool.acquire().await?;
        referral::list_by_visit_in(&mut conn, visit_id).await
    }

    pub async fn referrals_by_consultation(
        &self,
        consultation_id: i64,
    ) -> ClinicResult<Vec<Referral>> {
        let mut conn = self.pool.acquire().await?;
        referral::list_by_consultation_in(&mut conn, consultation_id).await
    }
}

#[cfg(test)]
mod record_store_tests {
    use super::*;
    use crate::db::connect_in_memory;
    use crate::testing;

    #[tokio::test]
    async fn vitals_upsert_replaces_the_single_row() {
        let pool = connect_in_memory().await.unwrap();
        let location = testing::seed_location(&pool, "Poipet").await;
        let patient = testing::seed_patient(&pool, location, "Alice").await;
        let visit = testing::seed_visit(&pool, patient, location, "2026-03-01", "1").await;

        let store = RecordStore::new(pool.clone());
        let first = store
            .upsert_vitals(
                visit,
                &VitalsInput {
                    height: Some(150.0),
                    weight: Some(48.0),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();

        let second = store
            .upsert_vitals(
                visit,
                &VitalsInput {
                    height: Some(151.0),
                    weight: Some(49.5),
                    temperature: Some(37.2),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.weight, 49.5);
        assert_eq!(second.temperature, Some(37.2));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vitals WHERE visit_id = ?1")
            .bind(visit)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn physiotherapy_upsert_replaces_painpoints_wholesale() {
        let pool = connect_in_memory().await.unwrap();
        let location = testing::seed_location(&pool, "Poipet").await;
        let patient = testing::seed_patient(&pool, location, "Alice").await;
        let visit = testing::seed_visit(&pool, patient, location, "2026-03-01", "1").await;

        let store = RecordStore::new(pool.clone());
        let points = |coords: &[(f64, f64)]| {
            coords
                .iter()
                .map(|&(x, y)| physiotherapy::PainpointInput {
                    x_coord: x,
                    y_coord: y,
                })
                .collect::<Vec<_>>()
        };

        store
            .upsert_physiotherapy(
                visit,
                &PhysiotherapyInput {
                    notes: Some("lower back".into()),
                    painpoints: points(&[(0.1, 0.2), (0.3, 0.4), (0.5, 0.6)]),
                },
                None,
            )
            .await
            .unwrap();

        let replaced = store
            .upsert_physiotherapy(
                visit,
                &PhysiotherapyInput {
                    notes: Some("left shoulder".into()),
                    painpoints: points(&[(0.9, 0.9)]),
                },
                None,
            )
            .await
            .unwrap();

        assert_eq!(replaced.painpoints.len(), 1);
        assert_eq!(replaced.physiotherapy.notes.as_deref(), Some("left shoulder"));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM painpoints")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn record_write_for_missing_visit_is_not_found() {
        let pool = connect_in_memory().await.unwrap();
        let store = RecordStore::new(pool.clone());
        let err = store
            .upsert_hef(
                42,
                &HefInput {
                    know_of_hef: Some(true),
                    has_hef: Some(false),
                    notes: None,
                },
                None,
            )
            .await
            .expect_err("expected not found");
        assert!(matches!(err, crate::ClinicError::NotFound("visit")));
    }
}
