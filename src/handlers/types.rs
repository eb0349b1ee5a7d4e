//! Request and response bodies for the HTTP control surface.

use axum::http::StatusCode;
use chrono::NaiveDate;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::lifecycle::RequirementStatus;
use crate::models::{email_log, reminder_job, requirement};
use crate::schedule::JobState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRequirementRequest {
    pub subcontractor_id: Uuid,
    pub document_type_id: Uuid,
    /// Optional staff-facing deadline; never drives the reminder cadence.
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Start the reminder flow immediately after creation.
    #[serde(default)]
    pub start_reminders: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ApproveRequest {
    #[serde(default)]
    pub valid_from: Option<NaiveDate>,
    /// Mandatory unless the document type never expires.
    #[serde(default)]
    pub valid_to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RejectRequest {
    pub reason: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RequirementResponse {
    pub id: Uuid,
    pub subcontractor_id: Uuid,
    pub document_type_id: Uuid,
    pub status: RequirementStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    pub escalated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_to: Option<NaiveDate>,
    #[schema(value_type = String, example = "2026-01-05T12:00:00Z")]
    pub created_at: DateTimeWithTimeZone,
    #[schema(value_type = String, example = "2026-01-05T12:00:00Z")]
    pub updated_at: DateTimeWithTimeZone,
}

impl TryFrom<requirement::Model> for RequirementResponse {
    type Error = ApiError;

    fn try_from(model: requirement::Model) -> Result<Self, Self::Error> {
        let status = RequirementStatus::parse(&model.status).map_err(|_| {
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "stored requirement status is not recognized",
            )
        })?;
        Ok(Self {
            id: model.id,
            subcontractor_id: model.subcontractor_id,
            document_type_id: model.document_type_id,
            status,
            rejection_reason: model.rejection_reason,
            due_date: model.due_date,
            escalated: model.escalated,
            valid_from: model.valid_from,
            valid_to: model.valid_to,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReminderJobResponse {
    pub id: Uuid,
    pub requirement_id: Uuid,
    pub state: JobState,
    #[schema(value_type = String, example = "2026-01-08T12:00:00Z")]
    pub next_run_at: DateTimeWithTimeZone,
    pub attempts: i32,
    pub max_attempts: i32,
    pub failures: i32,
    pub escalated: bool,
    #[schema(value_type = String, example = "2026-01-05T12:00:00Z")]
    pub created_at: DateTimeWithTimeZone,
    #[schema(value_type = String, example = "2026-01-05T12:00:00Z")]
    pub updated_at: DateTimeWithTimeZone,
}

impl TryFrom<reminder_job::Model> for ReminderJobResponse {
    type Error = ApiError;

    fn try_from(model: reminder_job::Model) -> Result<Self, Self::Error> {
        let state = JobState::parse(&model.state).map_err(|_| {
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "stored job state is not recognized",
            )
        })?;
        Ok(Self {
            id: model.id,
            requirement_id: model.requirement_id,
            state,
            next_run_at: model.next_run_at,
            attempts: model.attempts,
            max_attempts: model.max_attempts,
            failures: model.failures,
            escalated: model.escalated,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EmailLogResponse {
    pub id: Uuid,
    pub requirement_id: Uuid,
    pub to_email: String,
    pub template_key: String,
    pub status: String,
    #[schema(value_type = String, example = "2026-01-05T12:00:00Z")]
    pub created_at: DateTimeWithTimeZone,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, example = "2026-01-05T12:00:01Z")]
    pub sent_at: Option<DateTimeWithTimeZone>,
}

impl From<email_log::Model> for EmailLogResponse {
    fn from(model: email_log::Model) -> Self {
        Self {
            id: model.id,
            requirement_id: model.requirement_id,
            to_email: model.to_email,
            template_key: model.template_key,
            status: model.status,
            created_at: model.created_at,
            sent_at: model.sent_at,
        }
    }
}

/// Result of a manual immediate send.
#[derive(Debug, Serialize, ToSchema)]
pub struct SendOutcomeResponse {
    /// `sent` or `escalated`.
    pub outcome: String,
}
