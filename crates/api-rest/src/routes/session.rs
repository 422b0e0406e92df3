//! Passwordless login.

use axum::extract::State;
use axum::response::Json;
use axum::routing::post;
use axum::Router;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use mcr_core::users::User;

use crate::error::ApiError;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/auth/login", post(login))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 400, description = "Invalid username", body = crate::error::ErrorBody)
    )
)]
/// Exchange a username for a bearer token.
///
/// Creates the account on first login and reactivates deactivated ones.
#[axum::debug_handler]
pub(crate) async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state.users.login(&req.username).await?;
    let token = state
        .auth
        .issue_token(user.id, &user.username)
        .map_err(|e| {
            tracing::error!("token signing failed: {e}");
            ApiError::internal()
        })?;

    Ok(Json(LoginResponse { token, user }))
}
