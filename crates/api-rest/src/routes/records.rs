//! Per-visit clinical record endpoints.
//!
//! Every upsert kind gets the same pair: `GET /<kind>/:visit_id` returning
//! the current row (or `null`) and `POST /<kind>/:visit_id` performing the
//! insert-or-replace. Referrals get collection endpoints instead.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use utoipa::IntoParams;

use mcr_core::records::consultation::{Consultation, ConsultationInput};
use mcr_core::records::hef::{Hef, HefInput};
use mcr_core::records::history::{History, HistoryInput};
use mcr_core::records::physiotherapy::{PhysiotherapyDetail, PhysiotherapyInput};
use mcr_core::records::presenting_complaint::{PresentingComplaint, PresentingComplaintInput};
use mcr_core::records::referral::{Referral, ReferralInput};
use mcr_core::records::seva::{Seva, SevaInput};
use mcr_core::records::visual_acuity::{VisualAcuity, VisualAcuityInput};
use mcr_core::records::vitals::{Vitals, VitalsInput};

use crate::error::ApiError;
use crate::identity::AuthContext;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/vitals/:visit_id", get(get_vitals).post(upsert_vitals))
        .route("/hef/:visit_id", get(get_hef).post(upsert_hef))
        .route(
            "/visual-acuity/:visit_id",
            get(get_visual_acuity).post(upsert_visual_acuity),
        )
        .route(
            "/presenting-complaint/:visit_id",
            get(get_presenting_complaint).post(upsert_presenting_complaint),
        )
        .route("/history/:visit_id", get(get_history).post(upsert_history))
        .route(
            "/consultation/:visit_id",
            get(get_consultation).post(upsert_consultation),
        )
        .route(
            "/physiotherapy/:visit_id",
            get(get_physiotherapy).post(upsert_physiotherapy),
        )
        .route("/seva/:visit_id", get(get_seva).post(upsert_seva))
        .route("/referrals", get(list_referrals).post(create_referral))
        .route("/referrals/:id", axum::routing::put(update_referral))
        .route(
            "/consultations/:id/referrals",
            get(referrals_by_consultation),
        )
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ReferralQuery {
    pub visit_id: i64,
}

#[utoipa::path(
    get,
    path = "/vitals/{visit_id}",
    params(("visit_id" = i64, Path, description = "Visit id")),
    responses((status = 200, description = "Current vitals or null", body = Vitals))
)]
#[axum::debug_handler]
pub(crate) async fn get_vitals(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
    Path(visit_id): Path<i64>,
) -> Result<Json<Option<Vitals>>, ApiError> {
    state.authorize(&identity, "records.read")?;
    Ok(Json(state.records.vitals(visit_id).await?))
}

#[utoipa::path(
    post,
    path = "/vitals/{visit_id}",
    params(("visit_id" = i64, Path, description = "Visit id")),
    request_body = VitalsInput,
    responses(
        (status = 200, description = "Vitals created or replaced", body = Vitals),
        (status = 400, description = "Missing or negative height/weight", body = crate::error::ErrorBody),
        (status = 404, description = "Visit not found", body = crate::error::ErrorBody)
    )
)]
#[axum::debug_handler]
pub(crate) async fn upsert_vitals(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
    Path(visit_id): Path<i64>,
    Json(input): Json<VitalsInput>,
) -> Result<Json<Vitals>, ApiError> {
    state.authorize(&identity, "records.write")?;
    Ok(Json(
        state
            .records
            .upsert_vitals(visit_id, &input, identity.user_id)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/hef/{visit_id}",
    params(("visit_id" = i64, Path, description = "Visit id")),
    responses((status = 200, description = "Current HEF record or null", body = Hef))
)]
#[axum::debug_handler]
pub(crate) async fn get_hef(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
    Path(visit_id): Path<i64>,
) -> Result<Json<Option<Hef>>, ApiError> {
    state.authorize(&identity, "records.read")?;
    Ok(Json(state.records.hef(visit_id).await?))
}

#[utoipa::path(
    post,
    path = "/hef/{visit_id}",
    params(("visit_id" = i64, Path, description = "Visit id")),
    request_body = HefInput,
    responses(
        (status = 200, description = "HEF record created or replaced", body = Hef),
        (status = 400, description = "Missing booleans", body = crate::error::ErrorBody),
        (status = 404, description = "Visit not found", body = crate::error::ErrorBody)
    )
)]
#[axum::debug_handler]
pub(crate) async fn upsert_hef(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
    Path(visit_id): Path<i64>,
    Json(input): Json<HefInput>,
) -> Result<Json<Hef>, ApiError> {
    state.authorize(&identity, "records.write")?;
    Ok(Json(
        state
            .records
            .upsert_hef(visit_id, &input, identity.user_id)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/visual-acuity/{visit_id}",
    params(("visit_id" = i64, Path, description = "Visit id")),
    responses((status = 200, description = "Current reading or null", body = VisualAcuity))
)]
#[axum::debug_handler]
pub(crate) async fn get_visual_acuity(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
    Path(visit_id): Path<i64>,
) -> Result<Json<Option<VisualAcuity>>, ApiError> {
    state.authorize(&identity, "records.read")?;
    Ok(Json(state.records.visual_acuity(visit_id).await?))
}

#[utoipa::path(
    post,
    path = "/visual-acuity/{visit_id}",
    params(("visit_id" = i64, Path, description = "Visit id")),
    request_body = VisualAcuityInput,
    responses(
        (status = 200, description = "Reading created or replaced", body = VisualAcuity),
        (status = 404, description = "Visit not found", body = crate::error::ErrorBody)
    )
)]
#[axum::debug_handler]
pub(crate) async fn upsert_visual_acuity(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
    Path(visit_id): Path<i64>,
    Json(input): Json<VisualAcuityInput>,
) -> Result<Json<VisualAcuity>, ApiError> {
    state.authorize(&identity, "records.write")?;
    Ok(Json(
        state
            .records
            .upsert_visual_acuity(visit_id, &input, identity.user_id)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/presenting-complaint/{visit_id}",
    params(("visit_id" = i64, Path, description = "Visit id")),
    responses((status = 200, description = "Current record or null", body = PresentingComplaint))
)]
#[axum::debug_handler]
pub(crate) async fn get_presenting_complaint(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
    Path(visit_id): Path<i64>,
) -> Result<Json<Option<PresentingComplaint>>, ApiError> {
    state.authorize(&identity, "records.read")?;
    Ok(Json(state.records.presenting_complaint(visit_id).await?))
}

#[utoipa::path(
    post,
    path = "/presenting-complaint/{visit_id}",
    params(("visit_id" = i64, Path, description = "Visit id")),
    request_body = PresentingComplaintInput,
    responses(
        (status = 200, description = "Record created or replaced", body = PresentingComplaint),
        (status = 404, description = "Visit not found", body = crate::error::ErrorBody)
    )
)]
#[axum::debug_handler]
pub(crate) async fn upsert_presenting_complaint(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
    Path(visit_id): Path<i64>,
    Json(input): Json<PresentingComplaintInput>,
) -> Result<Json<PresentingComplaint>, ApiError> {
    state.authorize(&identity, "records.write")?;
    Ok(Json(
        state
            .records
            .upsert_presenting_complaint(visit_id, &input, identity.user_id)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/history/{visit_id}",
    params(("visit_id" = i64, Path, description = "Visit id")),
    responses((status = 200, description = "Current record or null", body = History))
)]
#[axum::debug_handler]
pub(crate) async fn get_history(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
    Path(visit_id): Path<i64>,
) -> Result<Json<Option<History>>, ApiError> {
    state.authorize(&identity, "records.read")?;
    Ok(Json(state.records.history(visit_id).await?))
}

#[utoipa::path(
    post,
    path = "/history/{visit_id}",
    params(("visit_id" = i64, Path, description = "Visit id")),
    request_body = HistoryInput,
    responses(
        (status = 200, description = "Record created or replaced", body = History),
        (status = 404, description = "Visit not found", body = crate::error::ErrorBody)
    )
)]
#[axum::debug_handler]
pub(crate) async fn upsert_history(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
    Path(visit_id): Path<i64>,
    Json(input): Json<HistoryInput>,
) -> Result<Json<History>, ApiError> {
    state.authorize(&identity, "records.write")?;
    Ok(Json(
        state
            .records
            .upsert_history(visit_id, &input, identity.user_id)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/consultation/{visit_id}",
    params(("visit_id" = i64, Path, description = "Visit id")),
    responses((status = 200, description = "Current record or null", body = Consultation))
)]
#[axum::debug_handler]
pub(crate) async fn get_consultation(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
    Path(visit_id): Path<i64>,
) -> Result<Json<Option<Consultation>>, ApiError> {
    state.authorize(&identity, "records.read")?;
    Ok(Json(state.records.consultation(visit_id).await?))
}

#[utoipa::path(
    post,
    path = "/consultation/{visit_id}",
    params(("visit_id" = i64, Path, description = "Visit id")),
    request_body = ConsultationInput,
    responses(
        (status = 200, description = "Record created or replaced", body = Consultation),
        (status = 404, description = "Visit not found", body = crate::error::ErrorBody)
    )
)]
#[axum::debug_handler]
pub(crate) async fn upsert_consultation(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
    Path(visit_id): Path<i64>,
    Json(input): Json<ConsultationInput>,
) -> Result<Json<Consultation>, ApiError> {
    state.authorize(&identity, "records.write")?;
    Ok(Json(
        state
            .records
            .upsert_consultation(visit_id, &input, identity.user_id)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/physiotherapy/{visit_id}",
    params(("visit_id" = i64, Path, description = "Visit id")),
    responses((status = 200, description = "Record with painpoints, or null", body = PhysiotherapyDetail))
)]
#[axum::debug_handler]
pub(crate) async fn get_physiotherapy(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
    Path(visit_id): Path<i64>,
) -> Result<Json<Option<PhysiotherapyDetail>>, ApiError> {
    state.authorize(&identity, "records.read")?;
    Ok(Json(state.records.physiotherapy(visit_id).await?))
}

#[utoipa::path(
    post,
    path = "/physiotherapy/{visit_id}",
    params(("visit_id" = i64, Path, description = "Visit id")),
    request_body = PhysiotherapyInput,
    responses(
        (status = 200, description = "Record upserted, painpoint set replaced", body = PhysiotherapyDetail),
        (status = 404, description = "Visit not found", body = crate::error::ErrorBody)
    )
)]
/// The submitted painpoints replace the existing set wholesale.
#[axum::debug_handler]
pub(crate) async fn upsert_physiotherapy(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
    Path(visit_id): Path<i64>,
    Json(input): Json<PhysiotherapyInput>,
) -> Result<Json<PhysiotherapyDetail>, ApiError> {
    state.authorize(&identity, "records.write")?;
    Ok(Json(
        state
            .records
            .upsert_physiotherapy(visit_id, &input, identity.user_id)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/seva/{visit_id}",
    params(("visit_id" = i64, Path, description = "Visit id")),
    responses((status = 200, description = "Current record or null", body = Seva))
)]
#[axum::debug_handler]
pub(crate) async fn get_seva(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
    Path(visit_id): Path<i64>,
) -> Result<Json<Option<Seva>>, ApiError> {
    state.authorize(&identity, "records.read")?;
    Ok(Json(state.records.seva(visit_id).await?))
}

#[utoipa::path(
    post,
    path = "/seva/{visit_id}",
    params(("visit_id" = i64, Path, description = "Visit id")),
    request_body = SevaInput,
    responses(
        (status = 200, description = "Record created or replaced", body = Seva),
        (status = 404, description = "Visit not found", body = crate::error::ErrorBody)
    )
)]
#[axum::debug_handler]
pub(crate) async fn upsert_seva(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
    Path(visit_id): Path<i64>,
    Json(input): Json<SevaInput>,
) -> Result<Json<Seva>, ApiError> {
    state.authorize(&identity, "records.write")?;
    Ok(Json(
        state
            .records
            .upsert_seva(visit_id, &input, identity.user_id)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/referrals",
    params(ReferralQuery),
    responses((status = 200, description = "Referrals for a visit, oldest first", body = [Referral]))
)]
#[axum::debug_handler]
pub(crate) async fn list_referrals(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
    Query(query): Query<ReferralQuery>,
) -> Result<Json<Vec<Referral>>, ApiError> {
    state.authorize(&identity, "records.read")?;
    Ok(Json(state.records.referrals_by_visit(query.visit_id).await?))
}

#[utoipa::path(
    post,
    path = "/referrals",
    request_body = ReferralInput,
    responses(
        (status = 201, description = "Referral created", body = Referral),
        (status = 400, description = "Unknown referral_type or missing fields", body = crate::error::ErrorBody),
        (status = 404, description = "Visit not found", body = crate::error::ErrorBody)
    )
)]
#[axum::debug_handler]
pub(crate) async fn create_referral(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
    Json(input): Json<ReferralInput>,
) -> Result<(StatusCode, Json<Referral>), ApiError> {
    state.authorize(&identity, "records.write")?;
    let referral = state
        .records
        .create_referral(&input, identity.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(referral)))
}

#[utoipa::path(
    put,
    path = "/referrals/{id}",
    params(("id" = i64, Path, description = "Referral id")),
    request_body = ReferralInput,
    responses(
        (status = 200, description = "Referral updated", body = Referral),
        (status = 404, description = "Referral not found", body = crate::error::ErrorBody)
    )
)]
#[axum::debug_handler]
pub(crate) async fn update_referral(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
    Path(id): Path<i64>,
    Json(input): Json<ReferralInput>,
) -> Result<Json<Referral>, ApiError> {
    state.authorize(&identity, "records.write")?;
    Ok(Json(
        state
            .records
            .update_referral(id, &input, identity.user_id)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/consultations/{id}/referrals",
    params(("id" = i64, Path, description = "Consultation id")),
    responses((status = 200, description = "Referrals linked to the consultation", body = [Referral]))
)]
/// Legacy discovery path: referrals looked up through their owning
/// consultation.
#[axum::debug_handler]
pub(crate) async fn referrals_by_consultation(
    State(state): State<AppState>,
    AuthContext(identity): AuthContext,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Referral>>, ApiError> {
    state.authorize(&identity, "records.read")?;
    Ok(Json(state.records.referrals_by_consultation(id).await?))
}
