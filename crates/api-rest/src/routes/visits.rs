//! Visit reads and queue-number assignment.

use axum::extract::{Path, Query, State};
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use mcr_core::queue::QueueEntry;
use mcr_core::visit::{Visit, VisitDetail};

use crate::error::ApiError;
use crate::identity::AuthContext;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/visits/by-location-and-date",
            get(queue_by_location_and_date),
        )
        .route("/visits/:id", get(get_visit).put(set_queue_no))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct QueueAssignment {
    pub queue_no: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct QueueQuery {
    pub location_id: i64,
    pub visit_date: NaiveDate,
}

#[utoipa::path(
    get,
    path = "/visits/{id}",
    params(("id" = i64, Path, description = "Visit id")),
    responses(
        (status = 200, description = "Full clinical bundle for the visit", body = VisitDetail),
        (status = 404, description = "Visit not found", body = crate::error::ErrorBody)
    )
)]
#[axum::debug_handler]
pub(crate) async fn get_visit(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
    Path(id): Path<i64>,
) -> Result<Json<VisitDetail>, ApiError> {
    state.authorize(&identity, "visits.read")?;
    Ok(Json(state.visits.detail(id).await?))
}

#[utoipa::path(
    put,
    path = "/visits/{id}",
    params(("id" = i64, Path, description = "Visit id")),
    request_body = QueueAssignment,
    responses(
        (status = 200, description = "Queue number assigned and mirrored", body = Visit),
        (status = 404, description = "Visit not found", body = crate::error::ErrorBody),
        (status = 409, description = "Queue token already taken", body = crate::error::ErrorBody)
    )
)]
/// Assign a queue token to a visit; the owning patient's mirror is
/// updated in the same operation.
#[axum::debug_handler]
pub(crate) async fn set_queue_no(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
    Path(id): Path<i64>,
    Json(req): Json<QueueAssignment>,
) -> Result<Json<Visit>, ApiError> {
    state.authorize(&identity, "visits.write")?;
    let visit = state
        .queue
        .set_visit_queue_no(id, &req.queue_no, identity.user_id)
        .await?;
    Ok(Json(visit))
}

#[utoipa::path(
    get,
    path = "/visits/by-location-and-date",
    params(QueueQuery),
    responses(
        (status = 200, description = "The day's queue, token-as-text order", body = [QueueEntry])
    )
)]
/// The walk-in queue for a location and date. Tokens sort as text
/// (`10A` before `2A`); clients pad when they need numeric order.
#[axum::debug_handler]
pub(crate) async fn queue_by_location_and_date(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
    Query(query): Query<QueueQuery>,
) -> Result<Json<Vec<QueueEntry>>, ApiError> {
    state.authorize(&identity, "visits.read")?;
    let entries = state
        .queue
        .by_location_and_date(query.location_id, query.visit_date)
        .await?;
    Ok(Json(entries))
}
