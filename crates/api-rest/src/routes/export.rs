//! Referral export endpoint.

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;

use mcr_core::export::{render_csv, ReferralExportRow};

use crate::error::ApiError;
use crate::identity::AuthContext;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/export/referrals-by-date", get(referrals_by_date))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ExportQuery {
    pub date: NaiveDate,
    /// `json` (default) or `csv`.
    pub format: Option<String>,
}

#[utoipa::path(
    get,
    path = "/export/referrals-by-date",
    params(ExportQuery),
    responses(
        (status = 200, description = "Referral rows for the date", body = [ReferralExportRow]),
        (status = 400, description = "Unsupported format", body = crate::error::ErrorBody),
        (status = 404, description = "No referrals on that date", body = crate::error::ErrorBody)
    )
)]
/// The day's referrals joined to patient and queue data, as JSON or a CSV
/// attachment.
#[axum::debug_handler]
pub(crate) async fn referrals_by_date(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    state.authorize(&identity, "export.read")?;

    let rows: Vec<ReferralExportRow> = state.export.referrals_by_date(query.date).await?;
    if rows.is_empty() {
        return Err(ApiError::from(mcr_core::ClinicError::NotFound("referrals")));
    }

    match query.format.as_deref() {
        None | Some("json") => Ok(Json(rows).into_response()),
        Some("csv") => {
            let filename = format!("Referrals_{}.csv", query.date);
            Ok((
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/csv".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{filename}\""),
                    ),
                ],
                render_csv(&rows),
            )
                .into_response())
        }
        Some(other) => Err(ApiError::bad_request(format!(
            "unsupported format {other:?} (use \"json\" or \"csv\")"
        ))),
    }
}
