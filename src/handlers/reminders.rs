//! Reminder flow endpoints, keyed by requirement.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use uuid::Uuid;

use crate::dispatcher::DispatchOutcome;
use crate::error::ApiError;
use crate::server::AppState;

use super::types::{ReminderJobResponse, SendOutcomeResponse};

/// Start the reminder flow; the first notification goes out on the next
/// sweep.
#[utoipa::path(
    post,
    path = "/requirements/{id}/reminders",
    params(("id" = Uuid, Path, description = "Requirement ID")),
    responses(
        (status = 201, description = "Reminder job created", body = ReminderJobResponse),
        (status = 404, description = "Requirement not found", body = ApiError),
        (status = 409, description = "A live reminder job already exists", body = ApiError)
    ),
    tag = "reminders"
)]
pub async fn create_reminder_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ReminderJobResponse>), ApiError> {
    let job = state.scheduler.create(id).await?;
    Ok((StatusCode::CREATED, Json(job.try_into()?)))
}

/// Current reminder job for the requirement, live or most recent.
#[utoipa::path(
    get,
    path = "/requirements/{id}/reminders",
    params(("id" = Uuid, Path, description = "Requirement ID")),
    responses(
        (status = 200, description = "Reminder job", body = ReminderJobResponse),
        (status = 404, description = "No reminder job for this requirement", body = ApiError)
    ),
    tag = "reminders"
)]
pub async fn get_reminder_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReminderJobResponse>, ApiError> {
    let job = state.scheduler.status(id).await?;
    Ok(Json(job.try_into()?))
}

/// Pause the live reminder job, freezing the ladder in place.
#[utoipa::path(
    post,
    path = "/requirements/{id}/reminders/pause",
    params(("id" = Uuid, Path, description = "Requirement ID")),
    responses(
        (status = 200, description = "Job paused", body = ReminderJobResponse),
        (status = 404, description = "No live reminder job", body = ApiError),
        (status = 409, description = "Job is not active", body = ApiError)
    ),
    tag = "reminders"
)]
pub async fn pause_reminders(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReminderJobResponse>, ApiError> {
    let job = state.scheduler.pause(id).await?;
    Ok(Json(job.try_into()?))
}

/// Resume a paused job; the next send lands after the grace window.
#[utoipa::path(
    post,
    path = "/requirements/{id}/reminders/resume",
    params(("id" = Uuid, Path, description = "Requirement ID")),
    responses(
        (status = 200, description = "Job resumed", body = ReminderJobResponse),
        (status = 404, description = "No live reminder job", body = ApiError),
        (status = 409, description = "Job is not paused", body = ApiError)
    ),
    tag = "reminders"
)]
pub async fn resume_reminders(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReminderJobResponse>, ApiError> {
    let job = state.scheduler.resume(id).await?;
    Ok(Json(job.try_into()?))
}

/// Stop the reminder flow permanently. Idempotent.
#[utoipa::path(
    post,
    path = "/requirements/{id}/reminders/stop",
    params(("id" = Uuid, Path, description = "Requirement ID")),
    responses(
        (status = 200, description = "Job completed", body = ReminderJobResponse),
        (status = 404, description = "No reminder job for this requirement", body = ApiError)
    ),
    tag = "reminders"
)]
pub async fn stop_reminders(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReminderJobResponse>, ApiError> {
    let job = state.scheduler.stop(id).await?;
    Ok(Json(job.try_into()?))
}

/// Dispatch one reminder immediately through the regular commit path.
#[utoipa::path(
    post,
    path = "/requirements/{id}/reminders/send",
    params(("id" = Uuid, Path, description = "Requirement ID")),
    responses(
        (status = 200, description = "Reminder dispatched or escalated", body = SendOutcomeResponse),
        (status = 404, description = "No live reminder job", body = ApiError),
        (status = 409, description = "Job paused or requirement ineligible", body = ApiError),
        (status = 502, description = "Notifier failed", body = ApiError)
    ),
    tag = "reminders"
)]
pub async fn send_reminder_now(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SendOutcomeResponse>, ApiError> {
    let outcome = state.dispatcher.send_immediate(id, Utc::now()).await?;
    let outcome = match outcome {
        DispatchOutcome::Escalated => "escalated",
        _ => "sent",
    };
    Ok(Json(SendOutcomeResponse {
        outcome: outcome.to_string(),
    }))
}
