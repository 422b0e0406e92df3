//! Staff account management.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use utoipa::ToSchema;

use mcr_core::users::User;

use crate::error::ApiError;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/users", get(list_users).post(create_user))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UsernameRequest {
    pub username: String,
}

#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "Active usernames, newest first", body = [String])
    )
)]
#[axum::debug_handler]
pub(crate) async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.users.active_usernames().await?))
}

#[utoipa::path(
    post,
    path = "/users",
    request_body = UsernameRequest,
    responses(
        (status = 201, description = "User created or reactivated", body = User),
        (status = 400, description = "Invalid username", body = crate::error::ErrorBody)
    )
)]
/// Create-or-reactivate a user. Idempotent by username.
#[axum::debug_handler]
pub(crate) async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<UsernameRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state.users.login(&req.username).await?;
    Ok((StatusCode::CREATED, Json(user)))
}
