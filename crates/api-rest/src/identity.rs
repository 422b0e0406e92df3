//! Request identity extraction.
//!
//! Reads the `Authorization: Bearer <token>` header and resolves it to an
//! [`Identity`]. In permissive mode a missing or invalid token degrades to
//! the anonymous `public` identity; strict mode rejects it.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use api_shared::auth::{AuthMode, Identity};

use crate::error::ApiError;
use crate::AppState;

/// The identity attached to the current request.
#[derive(Debug, Clone)]
pub struct AuthContext(pub Identity);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app = AppState::from_ref(state);

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));

        match token.and_then(|t| app.auth.verify(t)) {
            Some(claims) => Ok(Self(Identity::from_claims(claims))),
            None => match app.auth.mode {
                AuthMode::Permissive => Ok(Self(Identity::public())),
                AuthMode::Strict => Err(ApiError::unauthorized()),
            },
        }
    }
}
