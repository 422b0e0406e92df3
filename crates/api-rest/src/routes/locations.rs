//! Clinic location reference data.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{delete, get};
use axum::Router;
use serde::Deserialize;
use utoipa::ToSchema;

use mcr_core::location::Location;

use crate::error::ApiError;
use crate::identity::AuthContext;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/locations", get(list_locations).post(create_location))
        .route("/locations/:id", delete(deactivate_location))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LocationRequest {
    pub name: String,
}

#[utoipa::path(
    get,
    path = "/locations",
    responses(
        (status = 200, description = "Active locations, by name", body = [Location])
    )
)]
#[axum::debug_handler]
pub(crate) async fn list_locations(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
) -> Result<Json<Vec<Location>>, ApiError> {
    state.authorize(&identity, "locations.read")?;
    Ok(Json(state.locations.active().await?))
}

#[utoipa::path(
    post,
    path = "/locations",
    request_body = LocationRequest,
    responses(
        (status = 201, description = "Location created", body = Location),
        (status = 409, description = "Name already exists", body = crate::error::ErrorBody)
    )
)]
#[axum::debug_handler]
pub(crate) async fn create_location(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
    Json(req): Json<LocationRequest>,
) -> Result<(StatusCode, Json<Location>), ApiError> {
    state.authorize(&identity, "locations.write")?;
    let location = state.locations.create(&req.name).await?;
    Ok((StatusCode::CREATED, Json(location)))
}

#[utoipa::path(
    delete,
    path = "/locations/{id}",
    params(("id" = i64, Path, description = "Location id")),
    responses(
        (status = 204, description = "Location deactivated"),
        (status = 404, description = "Location not found", body = crate::error::ErrorBody)
    )
)]
/// Soft-deactivate: historical visits keep their location.
#[axum::debug_handler]
pub(crate) async fn deactivate_location(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.authorize(&identity, "locations.write")?;
    state.locations.deactivate(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
