//! Patient CRUD and lookup.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use utoipa::IntoParams;

use mcr_core::patient::{Patient, PatientDetail, PatientUpdate, PatientWithLocation};

use crate::error::ApiError;
use crate::identity::AuthContext;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/patients", get(list_patients))
        .route("/patients/search", get(search_patients))
        .route(
            "/patients/:id",
            get(get_patient).put(update_patient).delete(delete_patient),
        )
}

/// Exactly one of the two location filters must be supplied.
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListPatientsQuery {
    pub location_id: Option<i64>,
    pub location_name: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchQuery {
    pub q: String,
}

#[utoipa::path(
    get,
    path = "/patients",
    params(ListPatientsQuery),
    responses(
        (status = 200, description = "Patients at a location, by name", body = [PatientWithLocation])
    )
)]
#[axum::debug_handler]
pub(crate) async fn list_patients(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
    Query(query): Query<ListPatientsQuery>,
) -> Result<Json<Vec<PatientWithLocation>>, ApiError> {
    state.authorize(&identity, "patients.read")?;
    let patients = match (query.location_id, query.location_name) {
        (Some(id), None) => state.patients.by_location(id).await?,
        (None, Some(name)) => state.patients.by_location_name(&name).await?,
        _ => {
            return Err(ApiError::bad_request(
                "exactly one of location_id or location_name is required",
            ))
        }
    };
    Ok(Json(patients))
}

#[utoipa::path(
    get,
    path = "/patients/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Up to 10 matches on English or Khmer name", body = [Patient])
    )
)]
#[axum::debug_handler]
pub(crate) async fn search_patients(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    state.authorize(&identity, "patients.read")?;
    Ok(Json(state.patients.search(&query.q).await?))
}

#[utoipa::path(
    get,
    path = "/patients/{id}",
    params(("id" = i64, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient with visit list", body = PatientDetail),
        (status = 404, description = "Patient not found", body = crate::error::ErrorBody)
    )
)]
#[axum::debug_handler]
pub(crate) async fn get_patient(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
    Path(id): Path<i64>,
) -> Result<Json<PatientDetail>, ApiError> {
    state.authorize(&identity, "patients.read")?;
    Ok(Json(state.patients.detail(id).await?))
}

#[utoipa::path(
    put,
    path = "/patients/{id}",
    params(("id" = i64, Path, description = "Patient id")),
    request_body = PatientUpdate,
    responses(
        (status = 200, description = "Patient updated", body = Patient),
        (status = 404, description = "Patient not found", body = crate::error::ErrorBody)
    )
)]
/// Partial update: omitted fields keep their previous values.
#[axum::debug_handler]
pub(crate) async fn update_patient(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
    Path(id): Path<i64>,
    Json(update): Json<PatientUpdate>,
) -> Result<Json<Patient>, ApiError> {
    state.authorize(&identity, "patients.write")?;
    Ok(Json(state.patients.update(id, &update, identity.user_id).await?))
}

#[utoipa::path(
    delete,
    path = "/patients/{id}",
    params(("id" = i64, Path, description = "Patient id")),
    responses(
        (status = 204, description = "Patient and all attached records deleted"),
        (status = 404, description = "Patient not found", body = crate::error::ErrorBody)
    )
)]
#[axum::debug_handler]
pub(crate) async fn delete_patient(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.authorize(&identity, "patients.write")?;
    state.patients.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
