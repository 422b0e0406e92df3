//! Pharmacy stock ledger endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, patch, put};
use axum::Router;
use serde::Deserialize;
use utoipa::ToSchema;

use mcr_core::pharmacy::{PharmacyItem, PharmacyItemUpdate};

use crate::error::ApiError;
use crate::identity::AuthContext;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/pharmacy", get(list_items).post(create_item))
        .route("/pharmacy/:id", put(set_item).delete(delete_item))
        .route("/pharmacy/:id/adjust", patch(adjust_item))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewItemRequest {
    pub name: String,
    #[serde(default)]
    pub stock_level: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdjustRequest {
    pub delta: i64,
}

#[utoipa::path(
    get,
    path = "/pharmacy",
    responses((status = 200, description = "All items, by name", body = [PharmacyItem]))
)]
#[axum::debug_handler]
pub(crate) async fn list_items(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
) -> Result<Json<Vec<PharmacyItem>>, ApiError> {
    state.authorize(&identity, "pharmacy.read")?;
    Ok(Json(state.pharmacy.list().await?))
}

#[utoipa::path(
    post,
    path = "/pharmacy",
    request_body = NewItemRequest,
    responses(
        (status = 201, description = "Item created", body = PharmacyItem),
        (status = 409, description = "Item name already exists", body = crate::error::ErrorBody)
    )
)]
#[axum::debug_handler]
pub(crate) async fn create_item(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
    Json(req): Json<NewItemRequest>,
) -> Result<(StatusCode, Json<PharmacyItem>), ApiError> {
    state.authorize(&identity, "pharmacy.write")?;
    let item = state
        .pharmacy
        .create(&req.name, req.stock_level, identity.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

#[utoipa::path(
    put,
    path = "/pharmacy/{id}",
    params(("id" = i64, Path, description = "Item id")),
    request_body = PharmacyItemUpdate,
    responses(
        (status = 200, description = "Item updated; stock clamped at zero", body = PharmacyItem),
        (status = 404, description = "Item not found", body = crate::error::ErrorBody),
        (status = 409, description = "Item name already exists", body = crate::error::ErrorBody)
    )
)]
#[axum::debug_handler]
pub(crate) async fn set_item(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
    Path(id): Path<i64>,
    Json(update): Json<PharmacyItemUpdate>,
) -> Result<Json<PharmacyItem>, ApiError> {
    state.authorize(&identity, "pharmacy.write")?;
    Ok(Json(state.pharmacy.set(id, &update, identity.user_id).await?))
}

#[utoipa::path(
    patch,
    path = "/pharmacy/{id}/adjust",
    params(("id" = i64, Path, description = "Item id")),
    request_body = AdjustRequest,
    responses(
        (status = 200, description = "Stock adjusted; never below zero", body = PharmacyItem),
        (status = 404, description = "Item not found", body = crate::error::ErrorBody)
    )
)]
/// Relative stock adjustment. Over-subtraction clamps to zero rather
/// than erroring.
#[axum::debug_handler]
pub(crate) async fn adjust_item(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
    Path(id): Path<i64>,
    Json(req): Json<AdjustRequest>,
) -> Result<Json<PharmacyItem>, ApiError> {
    state.authorize(&identity, "pharmacy.write")?;
    Ok(Json(
        state.pharmacy.adjust(id, req.delta, identity.user_id).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/pharmacy/{id}",
    params(("id" = i64, Path, description = "Item id")),
    responses(
        (status = 204, description = "Item deleted"),
        (status = 404, description = "Item not found", body = crate::error::ErrorBody)
    )
)]
#[axum::debug_handler]
pub(crate) async fn delete_item(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.authorize(&identity, "pharmacy.write")?;
    state.pharmacy.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
