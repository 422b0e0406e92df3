//! # MCR Core
//!
//! Core business logic for the mobile clinic record backend.
//!
//! This crate contains pure data operations over the clinic's relational
//! store:
//! - patient registry and the composite registration transaction
//! - get-or-create visit resolution and the walk-in queue
//! - per-visit clinical records (vitals, HEF, visual acuity, presenting
//!   complaint, history, consultation, physiotherapy/painpoints, SEVA,
//!   referrals)
//! - pharmacy stock ledger and reference data (users, locations)
//!
//! **No API concerns**: authentication, HTTP servers, or wire formats
//! belong in `api-rest` and `api-shared`.

pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod location;
pub mod patient;
pub mod pharmacy;
pub mod queue;
pub mod records;
pub mod registration;
pub mod users;
pub mod visit;

pub use config::CoreConfig;
pub use error::{ClinicError, ClinicResult};
pub use export::ExportService;
pub use location::LocationService;
pub use patient::PatientService;
pub use pharmacy::PharmacyService;
pub use queue::{QueueService, QueueToken};
pub use records::RecordStore;
pub use registration::RegistrationService;
pub use users::UserService;
pub use visit::VisitResolver;

#[cfg(test)]
pub(crate) mod testing {
    //! Seed helpers for database-backed tests.

    use sqlx::sqlite::SqlitePool;

    pub async fn seed_user(pool: &SqlitePool, username: &str) -> i64 {
        sqlx::query_scalar("INSERT INTO users (username) VALUES (?1) RETURNING id")
            .bind(username)
            .fetch_one(pool)
            .await
            .expect("seed user")
    }

    pub async fn seed_location(pool: &SqlitePool, name: &str) -> i64 {
        sqlx::query_scalar("INSERT INTO locations (name) VALUES (?1) RETURNING id")
            .bind(name)
            .fetch_one(pool)
            .await
            .expect("seed location")
    }

    pub async fn seed_patient(pool: &SqlitePool, location_id: i64, english_name: &str) -> i64 {
        sqlx::query_scalar(
            "INSERT INTO patients (english_name, location_id) VALUES (?1, ?2) RETURNING id",
        )
        .bind(english_name)
        .bind(location_id)
        .fetch_one(pool)
        .await
        .expect("seed patient")
    }

    pub async fn seed_visit(
        pool: &SqlitePool,
        patient_id: i64,
        location_id: i64,
        visit_date: &str,
        queue_no: &str,
    ) -> i64 {
        sqlx::query_scalar(
            r#"
            INSERT INTO visits (patient_id, location_id, visit_date, queue_no)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING id
            "#,
        )
        .bind(patient_id)
        .bind(location_id)
        .bind(visit_date)
        .bind(queue_no)
        .fetch_one(pool)
        .await
        .expect("seed visit")
    }
}
