//! # HTTP Server
//!
//! axum application assembly: shared state, routing, OpenAPI docs, and the
//! serve loop with graceful shutdown.

use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{routing::get, routing::post, Router};
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::dispatcher::Dispatcher;
use crate::events::EventBus;
use crate::handlers;
use crate::repositories::{EmailLogRepository, RequirementRepository};
use crate::scheduler::ReminderScheduler;
use crate::telemetry::{self, TraceContext};

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub events: EventBus,
    pub requirements: RequirementRepository,
    pub scheduler: ReminderScheduler,
    pub dispatcher: Arc<Dispatcher>,
    pub email_log: EmailLogRepository,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::root,
        handlers::healthz,
        handlers::requirements::create_requirement,
        handlers::requirements::get_requirement,
        handlers::requirements::upload_document,
        handlers::requirements::start_review,
        handlers::requirements::approve_requirement,
        handlers::requirements::reject_requirement,
        handlers::requirements::withdraw_requirement,
        handlers::requirements::list_emails,
        handlers::reminders::create_reminder_job,
        handlers::reminders::get_reminder_job,
        handlers::reminders::pause_reminders,
        handlers::reminders::resume_reminders,
        handlers::reminders::stop_reminders,
        handlers::reminders::send_reminder_now,
    ),
    components(schemas(
        crate::models::ServiceInfo,
        crate::error::ApiError,
        crate::lifecycle::RequirementStatus,
        crate::schedule::JobState,
        crate::schedule::TemplateKey,
        handlers::types::CreateRequirementRequest,
        handlers::types::ApproveRequest,
        handlers::types::RejectRequest,
        handlers::types::RequirementResponse,
        handlers::types::ReminderJobResponse,
        handlers::types::EmailLogResponse,
        handlers::types::SendOutcomeResponse,
    )),
    info(
        title = "doctrack",
        description = "Compliance document tracking: requirement lifecycle, reminder scheduling, and dispatch"
    )
)]
pub struct ApiDoc;

/// Build the axum application with all routes and middleware.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route(
            "/requirements",
            post(handlers::requirements::create_requirement),
        )
        .route(
            "/requirements/{id}",
            get(handlers::requirements::get_requirement),
        )
        .route(
            "/requirements/{id}/upload",
            post(handlers::requirements::upload_document),
        )
        .route(
            "/requirements/{id}/review",
            post(handlers::requirements::start_review),
        )
        .route(
            "/requirements/{id}/approve",
            post(handlers::requirements::approve_requirement),
        )
        .route(
            "/requirements/{id}/reject",
            post(handlers::requirements::reject_requirement),
        )
        .route(
            "/requirements/{id}/withdraw",
            post(handlers::requirements::withdraw_requirement),
        )
        .route(
            "/requirements/{id}/emails",
            get(handlers::requirements::list_emails),
        )
        .route(
            "/requirements/{id}/reminders",
            post(handlers::reminders::create_reminder_job)
                .get(handlers::reminders::get_reminder_job),
        )
        .route(
            "/requirements/{id}/reminders/pause",
            post(handlers::reminders::pause_reminders),
        )
        .route(
            "/requirements/{id}/reminders/resume",
            post(handlers::reminders::resume_reminders),
        )
        .route(
            "/requirements/{id}/reminders/stop",
            post(handlers::reminders::stop_reminders),
        )
        .route(
            "/requirements/{id}/reminders/send",
            post(handlers::reminders::send_reminder_now),
        )
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn(trace_context_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Give every request a correlation ID so error bodies and logs can be
/// matched up.
async fn trace_context_middleware(request: Request, next: Next) -> Response {
    let context = TraceContext {
        trace_id: format!("corr-{}", &uuid::Uuid::new_v4().to_string()[..8]),
    };
    telemetry::with_trace_context(context, next.run(request)).await
}

/// Serve the application until the shutdown token fires.
pub async fn run_server(
    state: AppState,
    shutdown: CancellationToken,
) -> Result<(), anyhow::Error> {
    let bind_addr = state
        .config
        .bind_addr()
        .map_err(|err| anyhow::anyhow!("invalid API bind address: {err}"))?;
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(%bind_addr, "doctrack API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}
