//! REST API surface for the mobile clinic record backend.
//!
//! The router, handler modules, identity extraction and error mapping live
//! here; all domain logic stays in `mcr-core`. The crate also builds as a
//! standalone binary for development, while the workspace's main `mcr-run`
//! binary is the deployable entry point.

use axum::http::HeaderValue;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use api_shared::auth::Identity;
use api_shared::{AccessPolicy, AuthConfig};
use mcr_core::db::SqlitePool;
use mcr_core::{
    ExportService, LocationService, PatientService, PharmacyService, QueueService, RecordStore,
    RegistrationService, UserService, VisitResolver,
};

pub mod error;
pub mod identity;
pub mod routes;

use error::ApiError;

/// Shared state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub users: UserService,
    pub locations: LocationService,
    pub patients: PatientService,
    pub registration: RegistrationService,
    pub visits: VisitResolver,
    pub queue: QueueService,
    pub records: RecordStore,
    pub pharmacy: PharmacyService,
    pub export: ExportService,
    pub auth: AuthConfig,
    pub policy: AccessPolicy,
}

impl AppState {
    /// Build the state over an open pool with the default allow-all policy.
    pub fn new(pool: SqlitePool, auth: AuthConfig) -> Self {
        Self {
            users: UserService::new(pool.clone()),
            locations: LocationService::new(pool.clone()),
            patients: PatientService::new(pool.clone()),
            registration: RegistrationService::new(pool.clone()),
            visits: VisitResolver::new(pool.clone()),
            queue: QueueService::new(pool.clone()),
            records: RecordStore::new(pool.clone()),
            pharmacy: PharmacyService::new(pool.clone()),
            export: ExportService::new(pool),
            auth,
            policy: AccessPolicy::allow_all(),
        }
    }

    pub fn with_policy(mut self, policy: AccessPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Consult the access policy for `action`.
    pub(crate) fn authorize(&self, identity: &Identity, action: &str) -> Result<(), ApiError> {
        if self.policy.allows(identity, action) {
            Ok(())
        } else {
            Err(ApiError::forbidden(action))
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        routes::session::login,
        routes::users::list_users,
        routes::users::create_user,
        routes::locations::list_locations,
        routes::locations::create_location,
        routes::locations::deactivate_location,
        routes::registration::register,
        routes::registration::update_registration,
        routes::registration::delete_registration,
        routes::patients::list_patients,
        routes::patients::search_patients,
        routes::patients::get_patient,
        routes::patients::update_patient,
        routes::patients::delete_patient,
        routes::visits::get_visit,
        routes::visits::set_queue_no,
        routes::visits::queue_by_location_and_date,
        routes::records::get_vitals,
        routes::records::upsert_vitals,
        routes::records::get_hef,
        routes::records::upsert_hef,
        routes::records::get_visual_acuity,
        routes::records::upsert_visual_acuity,
        routes::records::get_presenting_complaint,
        routes::records::upsert_presenting_complaint,
        routes::records::get_history,
        routes::records::upsert_history,
        routes::records::get_consultation,
        routes::records::upsert_consultation,
        routes::records::get_physiotherapy,
        routes::records::upsert_physiotherapy,
        routes::records::get_seva,
        routes::records::upsert_seva,
        routes::records::list_referrals,
        routes::records::create_referral,
        routes::records::update_referral,
        routes::records::referrals_by_consultation,
        routes::pharmacy::list_items,
        routes::pharmacy::create_item,
        routes::pharmacy::set_item,
        routes::pharmacy::adjust_item,
        routes::pharmacy::delete_item,
        routes::export::referrals_by_date,
    ),
    components(schemas(
        HealthRes,
        error::ErrorBody,
        Identity,
        routes::session::LoginRequest,
        routes::session::LoginResponse,
        routes::users::UsernameRequest,
        routes::locations::LocationRequest,
        routes::visits::QueueAssignment,
        routes::pharmacy::NewItemRequest,
        routes::pharmacy::AdjustRequest,
        mcr_core::users::User,
        mcr_core::location::Location,
        mcr_core::patient::Patient,
        mcr_core::patient::PatientWithLocation,
        mcr_core::patient::NewPatient,
        mcr_core::patient::PatientUpdate,
        mcr_core::patient::VisitSummary,
        mcr_core::patient::PatientDetail,
        mcr_core::visit::Visit,
        mcr_core::visit::VisitRequest,
        mcr_core::visit::VisitDetail,
        mcr_core::queue::QueueEntry,
        mcr_core::registration::RegistrationRequest,
        mcr_core::registration::RegistrationUpdateRequest,
        mcr_core::registration::RegistrationOutcome,
        mcr_core::records::vitals::Vitals,
        mcr_core::records::vitals::VitalsInput,
        mcr_core::records::hef::Hef,
        mcr_core::records::hef::HefInput,
        mcr_core::records::visual_acuity::VisualAcuity,
        mcr_core::records::visual_acuity::VisualAcuityInput,
        mcr_core::records::presenting_complaint::PresentingComplaint,
        mcr_core::records::presenting_complaint::PresentingComplaintInput,
        mcr_core::records::history::History,
        mcr_core::records::history::HistoryInput,
        mcr_core::records::consultation::Consultation,
        mcr_core::records::consultation::ConsultationInput,
        mcr_core::records::physiotherapy::Physiotherapy,
        mcr_core::records::physiotherapy::Painpoint,
        mcr_core::records::physiotherapy::PainpointInput,
        mcr_core::records::physiotherapy::PhysiotherapyInput,
        mcr_core::records::physiotherapy::PhysiotherapyDetail,
        mcr_core::records::seva::Seva,
        mcr_core::records::seva::SevaInput,
        mcr_core::records::referral::Referral,
        mcr_core::records::referral::ReferralInput,
        mcr_core::pharmacy::PharmacyItem,
        mcr_core::pharmacy::PharmacyItemUpdate,
        mcr_core::export::ReferralExportRow,
    ))
)]
struct ApiDoc;

/// Assemble the full application router.
///
/// `allowed_origin` restricts CORS to one origin; `None` keeps the
/// development-friendly permissive layer.
pub fn router(state: AppState, allowed_origin: Option<HeaderValue>) -> Router {
    let cors = match allowed_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::permissive(),
    };

    Router::new()
        .route("/health", get(health))
        .merge(routes::session::router())
        .merge(routes::users::router())
        .merge(routes::locations::router())
        .merge(routes::registration::router())
        .merge(routes::patients::router())
        .merge(routes::visits::router())
        .merge(routes::records::router())
        .merge(routes::pharmacy::router())
        .merge(routes::export::router())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .with_state(state)
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint, used for monitoring and load balancer probes.
async fn health() -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "MCR REST API is alive".into(),
    })
}
