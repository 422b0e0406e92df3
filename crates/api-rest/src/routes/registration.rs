//! Composite registration endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{post, put};
use axum::Router;

use mcr_core::registration::{
    RegistrationOutcome, RegistrationRequest, RegistrationUpdateRequest,
};

use crate::error::ApiError;
use crate::identity::AuthContext;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/registration", post(register))
        .route(
            "/registration/:patient_id",
            put(update_registration).delete(delete_registration),
        )
}

#[utoipa::path(
    post,
    path = "/registration",
    request_body = RegistrationRequest,
    responses(
        (status = 201, description = "Patient registered", body = RegistrationOutcome),
        (status = 400, description = "Invalid registration data", body = crate::error::ErrorBody),
        (status = 409, description = "Queue token already taken", body = crate::error::ErrorBody)
    )
)]
/// Create a patient plus optional visit, vitals and HEF in one
/// transaction. Any failure rolls the whole registration back.
#[axum::debug_handler]
pub(crate) async fn register(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
    Json(req): Json<RegistrationRequest>,
) -> Result<(StatusCode, Json<RegistrationOutcome>), ApiError> {
    state.authorize(&identity, "registration.write")?;
    let outcome = state.registration.register(&req, identity.user_id).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

#[utoipa::path(
    put,
    path = "/registration/{patient_id}",
    params(("patient_id" = i64, Path, description = "Patient id")),
    request_body = RegistrationUpdateRequest,
    responses(
        (status = 200, description = "Registration updated", body = RegistrationOutcome),
        (status = 404, description = "Patient not found", body = crate::error::ErrorBody),
        (status = 409, description = "Queue token already taken", body = crate::error::ErrorBody)
    )
)]
#[axum::debug_handler]
pub(crate) async fn update_registration(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
    Path(patient_id): Path<i64>,
    Json(req): Json<RegistrationUpdateRequest>,
) -> Result<Json<RegistrationOutcome>, ApiError> {
    state.authorize(&identity, "registration.write")?;
    let outcome = state
        .registration
        .update(patient_id, &req, identity.user_id)
        .await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    delete,
    path = "/registration/{patient_id}",
    params(("patient_id" = i64, Path, description = "Patient id")),
    responses(
        (status = 204, description = "Patient and all attached records deleted"),
        (status = 404, description = "Patient not found", body = crate::error::ErrorBody)
    )
)]
/// Cascade delete: visits and every clinical record go with the patient.
#[axum::debug_handler]
pub(crate) async fn delete_registration(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
    Path(patient_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.authorize(&identity, "registration.write")?;
    state.patients.delete(patient_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
