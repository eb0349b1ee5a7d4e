//! # Error Handling
//!
//! This module provides unified error handling for the doctrack service:
//! a typed domain error for the scheduler core, and a consistent
//! problem+json response format with trace ID propagation at the HTTP
//! boundary.

use axum::{
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::telemetry;

/// Typed domain errors for requirement and reminder-job operations.
///
/// `NotFound`, `AlreadyExists`, and `InvalidTransition` are recovered at the
/// operation boundary and returned to callers. `Notifier` failures are
/// recovered per-job inside the dispatcher loop and never abort a sweep.
/// `Infrastructure` failures abort the current sweep and propagate.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    AlreadyExists(&'static str),
    #[error("invalid transition: {reason}")]
    InvalidTransition { reason: String },
    #[error("notifier failed: {0}")]
    Notifier(String),
    #[error("infrastructure failure: {0}")]
    Infrastructure(#[from] sea_orm::DbErr),
}

impl SchedulerError {
    /// Helper for the most common caller-facing error.
    pub fn invalid_transition(reason: impl Into<String>) -> Self {
        Self::InvalidTransition {
            reason: reason.into(),
        }
    }
}

/// Unified API error response structure
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiError {
    /// HTTP status code for the response
    #[serde(skip_serializing)]
    pub status: StatusCode,
    /// Error code for programmatic handling
    pub code: Box<str>,
    /// Human-readable error message
    pub message: Box<str>,
    /// Additional error details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Box<serde_json::Value>>,
    /// Correlation trace ID for debugging (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<Box<str>>,
}

impl ApiError {
    /// Create a new API error with the given status code and message
    pub fn new<S: Into<String>>(status: StatusCode, code: S, message: S) -> Self {
        Self {
            status,
            code: code.into().into_boxed_str(),
            message: message.into().into_boxed_str(),
            details: None,
            trace_id: Self::current_trace_id(),
        }
    }

    /// Add details to the error
    pub fn with_details<V: Into<serde_json::Value>>(mut self, details: V) -> Self {
        self.details = Some(Box::new(details.into()));
        self
    }

    /// Extract current trace ID from the active tracing span (falls back to generated correlation ID)
    fn current_trace_id() -> Option<Box<str>> {
        telemetry::current_trace_id()
            .map(|trace_id| trace_id.into_boxed_str())
            .or_else(|| {
                // Fallback: generate a correlation ID for basic client-server log correlation
                Some(format!("corr-{}", &uuid::Uuid::new_v4().to_string()[..8]).into_boxed_str())
            })
    }
}

/// Detect unique-constraint violations across the supported backends.
pub fn is_unique_violation(error: &sea_orm::DbErr) -> bool {
    use sea_orm::RuntimeErr;

    const PG_UNIQUE: &str = "23505";
    const SQLITE_DUPLICATE_CODES: &[&str] = &["1555", "2067"];

    let runtime_err = match error {
        sea_orm::DbErr::Query(RuntimeErr::SqlxError(sqlx_err))
        | sea_orm::DbErr::Exec(RuntimeErr::SqlxError(sqlx_err)) => sqlx_err,
        _ => return false,
    };

    let Some(db_error) = runtime_err.as_database_error() else {
        return false;
    };

    if db_error.is_unique_violation() {
        return true;
    }

    match db_error.code() {
        Some(code) => {
            let code_str = code.as_ref();
            code_str == PG_UNIQUE || SQLITE_DUPLICATE_CODES.contains(&code_str)
        }
        None => false,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(
            "content-type",
            HeaderValue::from_static("application/problem+json"),
        );

        (self.status, headers, axum::Json(self)).into_response()
    }
}

// Error mappers for common sources

impl From<SchedulerError> for ApiError {
    fn from(error: SchedulerError) -> Self {
        match &error {
            SchedulerError::NotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", &error.to_string())
            }
            SchedulerError::AlreadyExists(_) => {
                Self::new(StatusCode::CONFLICT, "ALREADY_EXISTS", &error.to_string())
            }
            SchedulerError::InvalidTransition { .. } => Self::new(
                StatusCode::CONFLICT,
                "INVALID_TRANSITION",
                &error.to_string(),
            ),
            SchedulerError::Notifier(_) => Self::new(
                StatusCode::BAD_GATEWAY,
                "NOTIFIER_FAILURE",
                &error.to_string(),
            ),
            SchedulerError::Infrastructure(db_err) => {
                tracing::error!(error = ?db_err, "Infrastructure failure surfaced to API");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_SERVER_ERROR",
                    "A storage error occurred",
                )
            }
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        tracing::error!("Internal error: {:?}", error);

        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "An internal error occurred",
        )
    }
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(error: sea_orm::DbErr) -> Self {
        if is_unique_violation(&error) {
            tracing::debug!(?error, "Unique constraint violation detected");
            return Self::new(
                StatusCode::CONFLICT,
                "ALREADY_EXISTS",
                "Resource already exists",
            );
        }

        match error {
            sea_orm::DbErr::RecordNotFound(record) => Self::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                &format!("Record not found: {}", record),
            ),
            sea_orm::DbErr::Conn(connection_err) => {
                tracing::error!("Database connection error: {:?}", connection_err);
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Database service unavailable",
                )
            }
            other => {
                tracing::error!("Database error: {:?}", other);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_SERVER_ERROR",
                    "Database error occurred",
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn not_found_maps_to_404() {
        let api: ApiError = SchedulerError::NotFound("requirement").into();
        assert_eq!(api.status, StatusCode::NOT_FOUND);
        assert_eq!(api.code, Box::from("NOT_FOUND"));
        assert!(api.message.contains("requirement"));
    }

    #[test]
    fn already_exists_maps_to_409() {
        let api: ApiError =
            SchedulerError::AlreadyExists("a reminder job already exists for this requirement")
                .into();
        assert_eq!(api.status, StatusCode::CONFLICT);
        assert_eq!(api.code, Box::from("ALREADY_EXISTS"));
    }

    #[test]
    fn invalid_transition_carries_specific_reason() {
        let api: ApiError = SchedulerError::invalid_transition("job already completed").into();
        assert_eq!(api.status, StatusCode::CONFLICT);
        assert_eq!(api.code, Box::from("INVALID_TRANSITION"));
        assert!(api.message.contains("job already completed"));
    }

    #[test]
    fn notifier_failure_maps_to_502() {
        let api: ApiError = SchedulerError::Notifier("relay timed out".to_string()).into();
        assert_eq!(api.status, StatusCode::BAD_GATEWAY);
        assert_eq!(api.code, Box::from("NOTIFIER_FAILURE"));
    }

    #[test]
    fn trace_id_generated_when_no_active_span() {
        let error = ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "Test error",
        );

        let trace_id = error.trace_id.expect("trace id present");
        assert!(trace_id.starts_with("corr-"));
        assert_eq!(trace_id.len(), 13);
    }

    #[test]
    fn content_type_is_problem_json() {
        let error = ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", "Test error");
        let response = error.into_response();
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/problem+json"
        );
    }

    #[test]
    fn db_record_not_found_maps_to_404() {
        let db_error = sea_orm::DbErr::RecordNotFound("reminder_job".to_string());
        let api_error: ApiError = db_error.into();

        assert_eq!(api_error.status, StatusCode::NOT_FOUND);
        assert!(api_error.message.contains("reminder_job"));
    }
}
