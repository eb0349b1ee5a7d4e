//! Requirement lifecycle endpoints.
//!
//! Reads run the lazy validity recompute before responding, so a `valid`
//! requirement whose window ran out overnight is served as
//! `expiring`/`expired` without waiting for the next sweep.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::server::AppState;

use super::types::{
    ApproveRequest, CreateRequirementRequest, EmailLogResponse, RejectRequest,
    RequirementResponse,
};

/// Create a new requirement in `missing` status.
#[utoipa::path(
    post,
    path = "/requirements",
    request_body = CreateRequirementRequest,
    responses(
        (status = 201, description = "Requirement created", body = RequirementResponse),
        (status = 404, description = "Subcontractor or document type not found", body = ApiError),
        (status = 409, description = "Live requirement already exists for this pair", body = ApiError)
    ),
    tag = "requirements"
)]
pub async fn create_requirement(
    State(state): State<AppState>,
    Json(payload): Json<CreateRequirementRequest>,
) -> Result<(StatusCode, Json<RequirementResponse>), ApiError> {
    let requirement = state
        .requirements
        .create(
            payload.subcontractor_id,
            payload.document_type_id,
            payload.due_date,
        )
        .await?;

    if payload.start_reminders {
        state.scheduler.create(requirement.id).await?;
    }

    Ok((StatusCode::CREATED, Json(requirement.try_into()?)))
}

/// Fetch one requirement, recomputing time-driven validity first.
#[utoipa::path(
    get,
    path = "/requirements/{id}",
    params(("id" = Uuid, Path, description = "Requirement ID")),
    responses(
        (status = 200, description = "Requirement", body = RequirementResponse),
        (status = 404, description = "Requirement not found", body = ApiError)
    ),
    tag = "requirements"
)]
pub async fn get_requirement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RequirementResponse>, ApiError> {
    let detail = state.requirements.get_detail(id).await?;
    let refreshed = state
        .requirements
        .refresh_validity(
            detail.requirement,
            &detail.document_type,
            Utc::now().date_naive(),
        )
        .await?;
    Ok(Json(refreshed.try_into()?))
}

/// Record a document upload; any prior rejection is cleared.
#[utoipa::path(
    post,
    path = "/requirements/{id}/upload",
    params(("id" = Uuid, Path, description = "Requirement ID")),
    responses(
        (status = 200, description = "Requirement moved to submitted", body = RequirementResponse),
        (status = 404, description = "Requirement not found", body = ApiError),
        (status = 409, description = "Requirement is withdrawn", body = ApiError)
    ),
    tag = "requirements"
)]
pub async fn upload_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RequirementResponse>, ApiError> {
    let requirement = state.requirements.record_upload(id).await?;
    Ok(Json(requirement.try_into()?))
}

/// A reviewer picked the submission up.
#[utoipa::path(
    post,
    path = "/requirements/{id}/review",
    params(("id" = Uuid, Path, description = "Requirement ID")),
    responses(
        (status = 200, description = "Requirement moved to in_review", body = RequirementResponse),
        (status = 404, description = "Requirement not found", body = ApiError),
        (status = 409, description = "Nothing submitted to review", body = ApiError)
    ),
    tag = "requirements"
)]
pub async fn start_review(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RequirementResponse>, ApiError> {
    let requirement = state.requirements.start_review(id).await?;
    Ok(Json(requirement.try_into()?))
}

/// Approve the submitted document and set its validity window.
///
/// Completes any live reminder job for the requirement.
#[utoipa::path(
    post,
    path = "/requirements/{id}/approve",
    params(("id" = Uuid, Path, description = "Requirement ID")),
    request_body = ApproveRequest,
    responses(
        (status = 200, description = "Requirement approved", body = RequirementResponse),
        (status = 404, description = "Requirement not found", body = ApiError),
        (status = 409, description = "Not reviewable, or expiry date missing", body = ApiError)
    ),
    tag = "requirements"
)]
pub async fn approve_requirement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ApproveRequest>,
) -> Result<Json<RequirementResponse>, ApiError> {
    let requirement = state
        .requirements
        .approve(id, payload.valid_from, payload.valid_to)
        .await?;
    state.scheduler.complete_for(id).await?;
    Ok(Json(requirement.try_into()?))
}

/// Reject the submitted document with a reason.
#[utoipa::path(
    post,
    path = "/requirements/{id}/reject",
    params(("id" = Uuid, Path, description = "Requirement ID")),
    request_body = RejectRequest,
    responses(
        (status = 200, description = "Requirement rejected", body = RequirementResponse),
        (status = 400, description = "Reason missing", body = ApiError),
        (status = 404, description = "Requirement not found", body = ApiError),
        (status = 409, description = "Nothing under review to reject", body = ApiError)
    ),
    tag = "requirements"
)]
pub async fn reject_requirement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RejectRequest>,
) -> Result<Json<RequirementResponse>, ApiError> {
    let reason = payload.reason.trim();
    if reason.is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
            "rejection reason must not be empty",
        )
        .with_details(serde_json::json!({ "field": "reason" })));
    }
    let requirement = state.requirements.reject(id, reason.to_string()).await?;
    Ok(Json(requirement.try_into()?))
}

/// Withdraw the requirement; it disappears from tracking but keeps its
/// history. Completes any live reminder job.
#[utoipa::path(
    post,
    path = "/requirements/{id}/withdraw",
    params(("id" = Uuid, Path, description = "Requirement ID")),
    responses(
        (status = 200, description = "Requirement hidden", body = RequirementResponse),
        (status = 404, description = "Requirement not found", body = ApiError),
        (status = 409, description = "Already withdrawn", body = ApiError)
    ),
    tag = "requirements"
)]
pub async fn withdraw_requirement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RequirementResponse>, ApiError> {
    let requirement = state.requirements.withdraw(id).await?;
    state.scheduler.complete_for(id).await?;
    Ok(Json(requirement.try_into()?))
}

/// Notification audit trail for a requirement, newest first.
#[utoipa::path(
    get,
    path = "/requirements/{id}/emails",
    params(("id" = Uuid, Path, description = "Requirement ID")),
    responses(
        (status = 200, description = "Email log entries", body = [EmailLogResponse]),
        (status = 404, description = "Requirement not found", body = ApiError)
    ),
    tag = "requirements"
)]
pub async fn list_emails(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<EmailLogResponse>>, ApiError> {
    state.requirements.get(id).await?;
    let entries = state.email_log.list_for_requirement(id).await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}
