//! End-to-end tests over the HTTP surface with an in-memory database.

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use doctrack::schedule::TemplateKey;

mod test_utils;
use test_utils::{create_requirement, request, spawn_app};

#[tokio::test]
async fn requirement_walks_the_happy_path_to_valid() {
    let app = spawn_app().await;
    let id = create_requirement(&app, true).await;

    let (status, body) = request(&app.app, "GET", &format!("/requirements/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "missing");

    let (status, body) =
        request(&app.app, "POST", &format!("/requirements/{id}/upload"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "submitted");

    let (status, _) =
        request(&app.app, "POST", &format!("/requirements/{id}/review"), None).await;
    assert_eq!(status, StatusCode::OK);

    let valid_to = (Utc::now().date_naive() + Duration::days(365)).to_string();
    let (status, body) = request(
        &app.app,
        "POST",
        &format!("/requirements/{id}/approve"),
        Some(json!({ "valid_to": valid_to })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "valid");

    // Approval completed the reminder job started at creation.
    let (status, body) =
        request(&app.app, "GET", &format!("/requirements/{id}/reminders"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "completed");
}

#[tokio::test]
async fn approve_without_expiry_date_is_a_conflict() {
    let app = spawn_app().await;
    let id = create_requirement(&app, false).await;

    request(&app.app, "POST", &format!("/requirements/{id}/upload"), None).await;
    let (status, body) = request(
        &app.app,
        "POST",
        &format!("/requirements/{id}/approve"),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_TRANSITION");
    assert!(body["trace_id"].is_string());
}

#[tokio::test]
async fn rejection_requires_a_reason_and_reupload_clears_it() {
    let app = spawn_app().await;
    let id = create_requirement(&app, false).await;
    request(&app.app, "POST", &format!("/requirements/{id}/upload"), None).await;

    let (status, body) = request(
        &app.app,
        "POST",
        &format!("/requirements/{id}/reject"),
        Some(json!({ "reason": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");

    let (status, body) = request(
        &app.app,
        "POST",
        &format!("/requirements/{id}/reject"),
        Some(json!({ "reason": "document is illegible" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "rejected");
    assert_eq!(body["rejection_reason"], "document is illegible");

    let (status, body) =
        request(&app.app, "POST", &format!("/requirements/{id}/upload"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "submitted");
    assert!(body["rejection_reason"].is_null());
}

#[tokio::test]
async fn duplicate_live_requirement_is_a_conflict_until_withdrawn() {
    let app = spawn_app().await;
    let id = create_requirement(&app, false).await;

    let (status, body) = request(
        &app.app,
        "POST",
        "/requirements",
        Some(json!({
            "subcontractor_id": app.subcontractor_id,
            "document_type_id": app.document_type_id,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_EXISTS");

    let (status, _) =
        request(&app.app, "POST", &format!("/requirements/{id}/withdraw"), None).await;
    assert_eq!(status, StatusCode::OK);

    // The pair is free again once the old requirement is hidden.
    create_requirement(&app, false).await;
}

#[tokio::test]
async fn reminder_controls_round_trip() {
    let app = spawn_app().await;
    let id = create_requirement(&app, false).await;

    let (status, body) =
        request(&app.app, "POST", &format!("/requirements/{id}/reminders"), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["state"], "active");
    assert_eq!(body["attempts"], 0);

    let (status, body) = request(
        &app.app,
        "POST",
        &format!("/requirements/{id}/reminders"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_EXISTS");

    let (status, body) = request(
        &app.app,
        "POST",
        &format!("/requirements/{id}/reminders/pause"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "paused");

    let (status, body) = request(
        &app.app,
        "POST",
        &format!("/requirements/{id}/reminders/pause"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_TRANSITION");

    let (status, body) = request(
        &app.app,
        "POST",
        &format!("/requirements/{id}/reminders/resume"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "active");

    let (status, body) = request(
        &app.app,
        "POST",
        &format!("/requirements/{id}/reminders/stop"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "completed");

    // Stop is idempotent.
    let (status, _) = request(
        &app.app,
        "POST",
        &format!("/requirements/{id}/reminders/stop"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn manual_send_dispatches_and_is_audited() {
    let app = spawn_app().await;
    let id = create_requirement(&app, true).await;

    let (status, body) = request(
        &app.app,
        "POST",
        &format!("/requirements/{id}/reminders/send"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "sent");

    let sent = app.notifier.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "info@held.example");
    assert_eq!(sent[0].1, TemplateKey::InviteInitial);

    let (status, body) =
        request(&app.app, "GET", &format!("/requirements/{id}/emails"), None).await;
    assert_eq!(status, StatusCode::OK);
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["template_key"], "invite_initial");
    assert_eq!(entries[0]["status"], "sent");

    let (_, body) =
        request(&app.app, "GET", &format!("/requirements/{id}/reminders"), None).await;
    assert_eq!(body["attempts"], 1);
}

#[tokio::test]
async fn manual_send_is_refused_while_under_review() {
    let app = spawn_app().await;
    let id = create_requirement(&app, true).await;

    request(&app.app, "POST", &format!("/requirements/{id}/upload"), None).await;
    request(&app.app, "POST", &format!("/requirements/{id}/review"), None).await;

    let (status, body) = request(
        &app.app,
        "POST",
        &format!("/requirements/{id}/reminders/send"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_TRANSITION");
    assert!(app.notifier.sent.lock().unwrap().is_empty());

    // The deferral leaves the job alive for a later rejection.
    let (status, body) =
        request(&app.app, "GET", &format!("/requirements/{id}/reminders"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "active");
}

#[tokio::test]
async fn unknown_requirement_gives_problem_json_404() {
    let app = spawn_app().await;
    let missing = Uuid::new_v4();

    let (status, body) =
        request(&app.app, "GET", &format!("/requirements/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
    assert!(body["message"].as_str().unwrap().contains("requirement"));
}

#[tokio::test]
async fn health_and_root_respond() {
    let app = spawn_app().await;

    let (status, _) = request(&app.app, "GET", "/healthz", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = request(&app.app, "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "doctrack");
}
