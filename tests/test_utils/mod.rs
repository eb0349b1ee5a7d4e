//! Shared fixtures for the HTTP integration tests: an in-memory database
//! with migrations applied, seeded master data, a capturing notifier, and
//! a JSON request helper over `tower::ServiceExt::oneshot`.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use migration::Migrator;
use sea_orm::{ActiveModelTrait, Database, DbErr, Set};
use sea_orm_migration::MigratorTrait;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use doctrack::config::AppConfig;
use doctrack::dispatcher::Dispatcher;
use doctrack::error::SchedulerError;
use doctrack::events::EventBus;
use doctrack::models::{document_type, subcontractor};
use doctrack::notify::{Notifier, NotifyContext, SendReceipt};
use doctrack::repositories::{
    EmailLogRepository, ReminderJobRepository, RequirementRepository,
};
use doctrack::schedule::TemplateKey;
use doctrack::scheduler::ReminderScheduler;
use doctrack::server::{create_app, AppState};

pub struct CapturingNotifier {
    pub sent: Mutex<Vec<(String, TemplateKey)>>,
}

#[async_trait]
impl Notifier for CapturingNotifier {
    async fn send(
        &self,
        to: &str,
        template: TemplateKey,
        _context: &NotifyContext,
    ) -> Result<SendReceipt, SchedulerError> {
        self.sent.lock().unwrap().push((to.to_string(), template));
        Ok(SendReceipt { id: Uuid::new_v4() })
    }
}

pub struct TestApp {
    pub app: Router,
    pub notifier: Arc<CapturingNotifier>,
    pub subcontractor_id: Uuid,
    pub document_type_id: Uuid,
}

pub async fn spawn_app() -> TestApp {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();

    let now = Utc::now().fixed_offset();
    let sub_id = Uuid::new_v4();
    // SQLite has no insert-id to return for uuid keys.
    match (subcontractor::ActiveModel {
        id: Set(sub_id),
        name: Set("Gerüstbau Held".to_string()),
        contact_email: Set("info@held.example".to_string()),
        status: Set("active".to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&db)
    .await)
    {
        Ok(_) | Err(DbErr::UnpackInsertId) => {}
        Err(err) => panic!("insert subcontractor: {err}"),
    }
    let doc_id = Uuid::new_v4();
    match (document_type::ActiveModel {
        id: Set(doc_id),
        slug: Set("trade-license".to_string()),
        display_name: Set("Trade license".to_string()),
        does_not_expire: Set(false),
        monthly_refresh: Set(false),
        expiry_lead_days: Set(30),
        created_at: Set(now),
    }
    .insert(&db)
    .await)
    {
        Ok(_) | Err(DbErr::UnpackInsertId) => {}
        Err(err) => panic!("insert document type: {err}"),
    }

    let config = AppConfig::default();
    let events = EventBus::default();
    let requirements = RequirementRepository::new(db.clone(), events.clone());
    let jobs = ReminderJobRepository::new(db.clone(), events.clone());
    let email_log = EmailLogRepository::new(db.clone());
    let notifier = Arc::new(CapturingNotifier {
        sent: Mutex::new(Vec::new()),
    });
    let scheduler = ReminderScheduler::new(requirements.clone(), jobs.clone(), &config.sweep);
    let dispatcher = Arc::new(Dispatcher::new(
        requirements.clone(),
        jobs,
        email_log.clone(),
        notifier.clone(),
        config.sweep.clone(),
        vec!["office@doctrack.example".to_string()],
    ));

    let state = AppState {
        db,
        config: Arc::new(config),
        events,
        requirements,
        scheduler,
        dispatcher,
        email_log,
    };

    TestApp {
        app: create_app(state),
        notifier,
        subcontractor_id: sub_id,
        document_type_id: doc_id,
    }
}

pub async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    let request = match body {
        Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
        None => builder.body(Body::from("{}")).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

pub async fn create_requirement(app: &TestApp, start_reminders: bool) -> Uuid {
    let (status, body) = request(
        &app.app,
        "POST",
        "/requirements",
        Some(json!({
            "subcontractor_id": app.subcontractor_id,
            "document_type_id": app.document_type_id,
            "start_reminders": start_reminders,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().parse().unwrap()
}
