//! Wire-level error mapping.
//!
//! Every handler failure becomes a `{kind, message}` body with the status
//! the taxonomy prescribes. Store-level detail is logged, never leaked.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use utoipa::ToSchema;

use mcr_core::ClinicError;

/// Structured error body carried by every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Machine-stable error kind.
    pub kind: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, kind: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                kind: kind.into(),
                message: message.into(),
            },
        }
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "a valid bearer token is required",
        )
    }

    pub fn forbidden(action: &str) -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            "forbidden",
            format!("not allowed to perform {action}"),
        )
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation", message)
    }

    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal",
            "internal server error",
        )
    }
}

impl From<ClinicError> for ApiError {
    fn from(err: ClinicError) -> Self {
        let status = match &err {
            ClinicError::Validation(_) => StatusCode::BAD_REQUEST,
            ClinicError::NotFound(_) => StatusCode::NOT_FOUND,
            ClinicError::DuplicateQueueEntry | ClinicError::DuplicateName => StatusCode::CONFLICT,
            ClinicError::ResourceExhausted => StatusCode::SERVICE_UNAVAILABLE,
            ClinicError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &err {
            ClinicError::Database(source) => {
                tracing::error!("database failure: {source}");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        Self::new(status, err.kind(), message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
