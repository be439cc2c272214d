//! Integration tests for the HTTP API
//!
//! Tests endpoints through the router without binding a socket

use henshin::core::create_router;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt;
use serde_json::Value;

fn create_test_router() -> Router {
    create_router(None)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Vec<u8>) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn send_json(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, method, uri, body).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn new_session(app: &Router) -> String {
    let (status, json) = send_json(app, "POST", "/protocol/new", None).await;
    assert_eq!(status, StatusCode::OK);
    json["session_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_router();
    let (status, json) = send_json(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["sessions_active"], 0);
}

#[tokio::test]
async fn test_create_session() {
    let app = create_test_router();
    let (status, json) = send_json(&app, "POST", "/protocol/new", None).await;

    assert_eq!(status, StatusCode::OK);
    let id = json["session_id"].as_str().unwrap();
    assert!(id.starts_with("S-"));
    assert_eq!(json["websocket_url"], format!("/ws/{}", id));
    assert_eq!(json["current_state"], "IDLE");
}

#[tokio::test]
async fn test_session_not_found_and_malformed() {
    let app = create_test_router();

    let (status, _) = send(&app, "GET", "/protocol/S-20260101-ZZZZ", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = send_json(&app, "GET", "/protocol/nonexistent", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "R601_BAD_SESSION_ID");
}

#[tokio::test]
async fn test_transition_flow() {
    let app = create_test_router();
    let id = new_session(&app).await;

    let (status, event) = send_json(
        &app,
        "POST",
        &format!("/protocol/{}/transition", id),
        Some(r#"{"to_state": "POSTED", "note": "submitted"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(event["from_state"], "IDLE");
    assert_eq!(event["to_state"], "POSTED");
    assert_eq!(event["status"], "OK");
    assert_eq!(event["note"], "submitted");
    assert!(event.get("refusal_code").is_none());

    let (status, json) = send_json(&app, "GET", &format!("/protocol/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["current_state"], "POSTED");
    assert_eq!(json["event_count"], 1);
    assert_eq!(json["audit"], "INCOMPLETE");
    assert_eq!(json["terminal"], false);
    assert_eq!(json["log_sha256"].as_str().unwrap().len(), 64);
}

#[tokio::test]
async fn test_illegal_transition_is_conflict() {
    let app = create_test_router();
    let id = new_session(&app).await;

    let (status, json) = send_json(
        &app,
        "POST",
        &format!("/protocol/{}/transition", id),
        Some(r#"{"to_state": "APPROVED"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "R501_ILLEGAL_TRANSITION");
    assert_eq!(json["current_state"], "IDLE");
    assert!(json["error"].as_str().unwrap().contains("IDLE -> APPROVED"));

    let (_, json) = send_json(&app, "GET", &format!("/protocol/{}", id), None).await;
    assert_eq!(json["event_count"], 0);
}

#[tokio::test]
async fn test_unknown_state_name() {
    let app = create_test_router();
    let id = new_session(&app).await;

    let (status, json) = send_json(
        &app,
        "POST",
        &format!("/protocol/{}/transition", id),
        Some(r#"{"to_state": "LIMBO"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "R505_UNKNOWN_STATE");
}

#[tokio::test]
async fn test_refuse_then_terminal() {
    let app = create_test_router();
    let id = new_session(&app).await;

    let (status, json) = send_json(
        &app,
        "POST",
        &format!("/protocol/{}/refuse", id),
        Some(r#"{"code": "BAD_VIBES"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "R503_UNKNOWN_REFUSAL_CODE");

    let (status, event) = send_json(
        &app,
        "POST",
        &format!("/protocol/{}/refuse", id),
        Some(r#"{"code": "RESONANCE_UNSTABLE"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(event["to_state"], "REFUSED");
    assert_eq!(event["refusal_code"], "RESONANCE_UNSTABLE");
    assert_eq!(event["note"], "Protocol rejected");

    let (status, json) = send_json(&app, "POST", &format!("/protocol/{}/happy-path", id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["current_state"], "REFUSED");
    assert_eq!(json["code"], "R502_TERMINAL_STATE");

    let (status, json) = send_json(
        &app,
        "POST",
        &format!("/protocol/{}/transition", id),
        Some(r#"{"to_state": "POSTED"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "R501_ILLEGAL_TRANSITION");
    assert_eq!(json["current_state"], "REFUSED");

    let (_, json) = send_json(&app, "GET", &format!("/protocol/{}", id), None).await;
    assert_eq!(json["terminal"], true);
    assert_eq!(json["audit"], "READY");
}

#[tokio::test]
async fn test_happy_path_and_log() {
    let app = create_test_router();
    let id = new_session(&app).await;

    let (status, events) = send_json(&app, "POST", &format!("/protocol/{}/happy-path", id), None).await;
    assert_eq!(status, StatusCode::OK);
    let events = events.as_array().unwrap();
    assert_eq!(events.len(), 12);
    assert_eq!(events[11]["to_state"], "ARCHIVED");

    let (status, bytes) = send(&app, "GET", &format!("/protocol/{}/log", id), None).await;
    assert_eq!(status, StatusCode::OK);
    let log = String::from_utf8(bytes).unwrap();
    assert_eq!(log.lines().count(), 12);
    assert!(log.lines().last().unwrap().contains("ACTIVE->ARCHIVED status=OK"));
}

#[tokio::test]
async fn test_terminal_session_writes_audit_bundle() {
    let dir = std::env::temp_dir().join(format!("henshin_api_it_{}", std::process::id()));
    let app = create_router(Some(dir.clone()));
    let id = new_session(&app).await;

    let (status, _) = send_json(&app, "POST", &format!("/protocol/{}/happy-path", id), None).await;
    assert_eq!(status, StatusCode::OK);

    let summary = std::fs::read_to_string(dir.join(&id).join("AuditSummary.txt")).unwrap();
    assert!(summary.contains("FINAL_STATUS: ARCHIVED"));
    assert!(summary.contains("AUDIT: READY"));

    // the saved log is the session's log, and the session stays readable
    let on_disk = std::fs::read_to_string(dir.join(&id).join("DepositionLog.txt")).unwrap();
    let (status, served) = send(&app, "GET", &format!("/protocol/{}/log", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(served).unwrap(), on_disk);

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_simulate_endpoint() {
    let app = create_test_router();
    let doc = r#"{
        "rig": "right_arm",
        "dock": {"hold_to_equip_sec": 0.25},
        "frames": [
            {"dt_sec": 0.125, "joints": {"right_elbow": [0.32, 0.56], "right_wrist": [0.225, 0.625]}},
            {"dt_sec": 0.125, "joints": {"right_elbow": [0.32, 0.56], "right_wrist": [0.225, 0.625]}},
            {"dt_sec": 0.125, "joints": {"right_elbow": [0.32, 0.56], "right_wrist": [0.225, 0.625]}}
        ]
    }"#;

    let (status, json) = send_json(&app, "POST", "/simulate", Some(doc)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["equipped"], true);
    assert_eq!(json["equip_frame"], 1);
    assert_eq!(json["frames"].as_array().unwrap().len(), 3);
    assert_eq!(json["frames"][0]["hold_sec"], 0.125);
    // the gate clears its accumulator when it fires
    assert_eq!(json["frames"][1]["hold_sec"], 0.0);
}

#[tokio::test]
async fn test_simulate_rejects_bad_config() {
    let app = create_test_router();
    let (status, json) = send_json(&app, "POST", "/simulate", Some(r#"{"rig": "tail"}"#)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "R406_UNKNOWN_RIG");
}
