//! # HTTP Handlers
//!
//! Route handlers for the doctrack control surface. Handlers stay thin:
//! they parse, delegate to the scheduler/dispatcher/repositories, and map
//! domain errors into problem+json responses.

pub mod reminders;
pub mod requirements;
pub mod types;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::db;
use crate::error::ApiError;
use crate::models::ServiceInfo;
use crate::server::AppState;

/// Service information endpoint.
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service name and version", body = ServiceInfo)
    ),
    tag = "service"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// Liveness and database health probe.
#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 503, description = "Database unreachable", body = ApiError)
    ),
    tag = "service"
)]
pub async fn healthz(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    db::health_check(&state.db).await.map_err(|err| {
        tracing::error!(error = %err, "health check failed");
        ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            "database health check failed",
        )
    })?;
    Ok(StatusCode::OK)
}
