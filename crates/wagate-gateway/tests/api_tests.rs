// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! REST surface tests against the full stack over the loopback network.

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;
use wagate_core::SessionStatus;
use wagate_gateway::{AppState, AuthConfig, HealthState, router};
use wagate_test_utils::TestHarness;

const KEY: &str = "test-api-key";
const PHONE: &str = "5511999999999";

fn app_with_auth(harness: &TestHarness, auth: AuthConfig) -> Router {
    let state = AppState {
        runtime: harness.runtime.clone(),
        webhooks: harness.registry.clone(),
        auth,
        health: HealthState::new("test"),
        connect_wait: Duration::from_secs(2),
    };
    router(state, Duration::from_secs(10))
}

fn app(harness: &TestHarness) -> Router {
    app_with_auth(harness, AuthConfig::new(Some(KEY.to_string())))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-api-key", KEY);
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    send(app, request(method, uri, body)).await
}

async fn create(app: &Router, name: &str) -> String {
    let (status, body) = call(app, "POST", "/sessions/create", Some(json!({ "name": name }))).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["sessionId"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn root_and_health_are_public() {
    let harness = TestHarness::new().await.unwrap();
    let app = app(&harness);

    let unauthenticated = |uri: &str| Request::get(uri).body(Body::empty()).unwrap();

    let (status, body) = send(&app, unauthenticated("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "wagate");
    assert_eq!(body["environment"], "test");

    let (status, body) = send(&app, unauthenticated("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["sessions"]["total"], 0);
    assert!(body["uptimeSecs"].is_u64());

    let (status, _) = send(&app, unauthenticated("/metrics")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn metrics_render_when_installed() {
    let harness = TestHarness::new().await.unwrap();
    let mut health = HealthState::new("test");
    health.prometheus_render = Some(std::sync::Arc::new(|| "wagate_sessions_live 0\n".to_string()));
    let state = AppState {
        runtime: harness.runtime.clone(),
        webhooks: harness.registry.clone(),
        auth: AuthConfig::new(Some(KEY.to_string())),
        health,
        connect_wait: Duration::from_secs(1),
    };
    let app = router(state, Duration::from_secs(5));

    let response = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("wagate_sessions_live"));
}

#[tokio::test]
async fn api_key_is_required() {
    let harness = TestHarness::new().await.unwrap();
    let app = app(&harness);

    let (status, body) = send(
        &app,
        Request::get("/sessions/list").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
    assert!(body["timestamp"].is_string());

    let (status, _) = send(
        &app,
        Request::get("/sessions/list")
            .header("x-api-key", "wrong")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    for value in [KEY.to_string(), format!("Bearer {KEY}")] {
        let (status, _) = send(
            &app,
            Request::get("/sessions/list")
                .header(header::AUTHORIZATION, value)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn api_key_header_accepted_next_to_foreign_authorization() {
    let harness = TestHarness::new().await.unwrap();
    let app = app(&harness);

    let (status, body) = send(
        &app,
        Request::get("/sessions/list")
            .header(header::AUTHORIZATION, "Basic Zm9vOmJhcg==")
            .header("x-api-key", KEY)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, _) = send(
        &app,
        Request::get("/sessions/list")
            .header(header::AUTHORIZATION, KEY)
            .header("x-api-key", "stale-key")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Request::get("/sessions/list")
            .header(header::AUTHORIZATION, "Basic Zm9vOmJhcg==")
            .header("x-api-key", "wrong")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "invalid API key");
}

#[tokio::test]
async fn missing_configured_key_rejects_everything() {
    let harness = TestHarness::new().await.unwrap();
    let app = app_with_auth(&harness, AuthConfig::new(None));

    let (status, _) = call(&app, "GET", "/sessions/list", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn create_get_and_list_sessions() {
    let harness = TestHarness::new().await.unwrap();
    let app = app(&harness);

    let (status, body) = call(&app, "POST", "/sessions/create", Some(json!({ "name": "s1" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "s1");
    assert_eq!(body["status"], "Disconnected");
    assert!(body.get("deviceId").is_none());
    assert!(body.get("qrCode").is_none());
    let id = body["sessionId"].as_str().unwrap().to_string();

    let (status, body) = call(&app, "POST", "/sessions/create", Some(json!({ "name": "s1" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "already_exists");

    let (status, body) = call(&app, "POST", "/sessions/create", Some(json!({ "name": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = call(&app, "GET", &format!("/sessions/{id}/info"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sessionId"], id.as_str());

    create(&app, "s2").await;
    let (status, body) = call(&app, "GET", "/sessions/list?limit=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["sessions"].as_array().unwrap().len(), 1);

    let (status, body) = call(&app, "GET", "/sessions/missing/info", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn malformed_requests_are_validation_errors() {
    let harness = TestHarness::new().await.unwrap();
    let app = app(&harness);

    let bad_json = Request::post("/sessions/create")
        .header("x-api-key", KEY)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, bad_json).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, _) = call(&app, "GET", "/sessions/list?limit=501", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = call(&app, "GET", "/sessions/list?limit=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &app,
        "POST",
        "/sessions/create",
        Some(json!({ "name": "p", "settings": { "proxy": { "scheme": "ftp", "host": "h", "port": 1 } } })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, body) = call(&app, "GET", "/no/such/route", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn create_with_qr_then_pair() {
    let harness = TestHarness::new().await.unwrap();
    let app = app(&harness);

    let (status, body) = call(
        &app,
        "POST",
        "/sessions/create",
        Some(json!({ "name": "qr", "qrCode": true })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "AwaitingQR");
    assert!(body["qrCode"].is_string());
    assert!(body["qrCodeExpiresAt"].is_string());
    let id = body["sessionId"].as_str().unwrap().to_string();

    let (status, body) = call(&app, "GET", &format!("/sessions/{id}/qr"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "AwaitingQR");
    assert!(
        body["qrCodeBase64"]
            .as_str()
            .unwrap()
            .starts_with("data:image/svg+xml;base64,")
    );

    harness.network.scan_qr(&id).await.unwrap();
    harness
        .wait_for_status(&id, SessionStatus::Connected)
        .await
        .unwrap();

    let (status, body) = call(&app, "GET", &format!("/sessions/{id}/qr"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "already_connected");

    let (_, body) = call(&app, "GET", &format!("/sessions/{id}/info"), None).await;
    assert_eq!(body["status"], "Connected");
    assert!(body["deviceId"].is_string());
    assert!(body["connectedAt"].is_string());
}

#[tokio::test]
async fn qr_outside_pairing_is_a_conflict() {
    let harness = TestHarness::new().await.unwrap();
    let app = app(&harness);
    let id = create(&app, "idle").await;

    let (status, body) = call(&app, "GET", &format!("/sessions/{id}/qr"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "not_awaiting_qr");
    assert_eq!(body["details"]["status"], "Disconnected");

    let (status, _) = call(&app, "GET", "/sessions/missing/qr", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn session_actions_report_status() {
    let harness = TestHarness::new().await.unwrap();
    let app = app(&harness);
    let id = harness.paired_session("actions").await.unwrap().record.id;

    let (status, body) = call(&app, "POST", &format!("/sessions/{id}/disconnect"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["sessionId"], id.as_str());
    assert_eq!(body["status"], "Disconnected");

    let (status, body) = call(&app, "POST", &format!("/sessions/{id}/connect"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("qrCode").is_none());
    harness
        .wait_for_status(&id, SessionStatus::Connected)
        .await
        .unwrap();

    let (status, body) = call(&app, "POST", &format!("/sessions/{id}/logout"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "LoggedOut");

    let (status, body) = call(&app, "DELETE", &format!("/sessions/{id}/delete"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Deleted");

    let (status, _) = call(&app, "GET", &format!("/sessions/{id}/info"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn send_text_and_validation() {
    let harness = TestHarness::new().await.unwrap();
    let app = app(&harness);
    let id = harness.paired_session("sender").await.unwrap().record.id;

    let (status, body) = call(
        &app,
        "POST",
        &format!("/sessions/{id}/send/message/text"),
        Some(json!({ "to": PHONE, "text": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "sent");
    assert!(body["messageId"].is_string());
    assert!(body["sentAt"].is_string());
    assert_eq!(harness.network.sent_messages(&id).len(), 1);

    let (status, body) = call(
        &app,
        "POST",
        &format!("/sessions/{id}/send/message/fax"),
        Some(json!({ "to": PHONE })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, body) = call(
        &app,
        "POST",
        &format!("/sessions/{id}/send/message/text"),
        Some(json!({ "to": "not-a-number", "text": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_recipient");

    let (status, body) = call(
        &app,
        "POST",
        &format!("/sessions/{id}/send/message/poll"),
        Some(json!({ "to": PHONE, "question": "?", "options": ["only one"] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, _) = call(
        &app,
        "POST",
        &format!("/sessions/{id}/send/message/text"),
        Some(json!({ "text": "no recipient" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(harness.network.sent_messages(&id).len(), 1);
}

#[tokio::test]
async fn send_requires_connected_session() {
    let harness = TestHarness::new().await.unwrap();
    let app = app(&harness);
    let id = create(&app, "offline").await;

    let (status, body) = call(
        &app,
        "POST",
        &format!("/sessions/{id}/send/message/text"),
        Some(json!({ "to": PHONE, "text": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
    assert_eq!(body["error"], "not_connected");

    let (status, body) = call(
        &app,
        "POST",
        "/sessions/missing/send/message/text",
        Some(json!({ "to": "not-a-number", "text": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn group_routes() {
    let harness = TestHarness::new().await.unwrap();
    let app = app(&harness);
    let id = harness.paired_session("groups").await.unwrap().record.id;
    let base = format!("/sessions/{id}/groups");

    let (status, info) = call(
        &app,
        "POST",
        &format!("{base}/create"),
        Some(json!({ "name": "team", "participants": [PHONE] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{info}");
    let jid = info["groupJid"].as_str().unwrap().to_string();
    assert!(jid.ends_with("@g.us"));
    assert_eq!(info["participants"].as_array().unwrap().len(), 2);

    let (status, body) = call(
        &app,
        "POST",
        &format!("{base}/name"),
        Some(json!({ "groupJid": jid, "name": "renamed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = call(&app, "GET", &format!("{base}/info?groupJid={jid}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "renamed");

    let (_, body) = call(&app, "GET", &format!("{base}/list"), None).await;
    assert_eq!(body["groups"].as_array().unwrap().len(), 1);

    let (status, first) = call(&app, "GET", &format!("{base}/invite-link?groupJid={jid}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, second) =
        call(&app, "DELETE", &format!("{base}/invite-link?groupJid={jid}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(first["link"], second["link"]);

    let (status, body) = call(
        &app,
        "POST",
        &format!("{base}/participants"),
        Some(json!({ "groupJid": jid, "participants": ["5511888888888"], "action": "add" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["participants"][0]["jid"], "5511888888888@s.whatsapp.net");

    let (status, body) = call(
        &app,
        "POST",
        &format!("{base}/settings/disappearing"),
        Some(json!({ "groupJid": jid, "duration": 3600 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, _) = call(
        &app,
        "POST",
        &format!("{base}/settings/announce"),
        Some(json!({ "groupJid": jid, "announce": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app,
        "POST",
        &format!("{base}/photo"),
        Some(json!({ "groupJid": jid, "image": { "url": "https://example.com/p.png" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["pictureId"].is_string());

    let (status, _) = call(&app, "GET", &format!("{base}/info?groupJid={PHONE}"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        "POST",
        &format!("{base}/leave"),
        Some(json!({ "groupJid": jid })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = call(&app, "GET", &format!("{base}/list"), None).await;
    assert!(body["groups"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn group_routes_require_connection() {
    let harness = TestHarness::new().await.unwrap();
    let app = app(&harness);
    let id = create(&app, "offline-groups").await;

    let (status, _) = call(&app, "GET", &format!("/sessions/{id}/groups/list"), None).await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
}

#[tokio::test]
async fn webhook_routes() {
    let harness = TestHarness::new().await.unwrap();
    let app = app(&harness);
    let id = create(&app, "hooked").await;
    let uri = format!("/sessions/{id}/webhook");

    let (status, _) = call(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(
        &app,
        "PUT",
        &uri,
        Some(json!({ "url": "http://127.0.0.1:9/hook", "secret": "0123456789abcdef" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["hasSecret"], true);
    assert_eq!(body["events"], json!(["All"]));
    assert_eq!(body["enabled"], true);
    assert!(body.get("secret").is_none());

    let (status, body) = call(
        &app,
        "PUT",
        &uri,
        Some(json!({ "url": "ftp://nope", "events": ["Message"] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = call(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["url"], "http://127.0.0.1:9/hook");

    let (status, body) = call(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let (status, _) = call(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(
        &app,
        "PUT",
        "/sessions/missing/webhook",
        Some(json!({ "url": "http://127.0.0.1:9/hook" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_with_webhook_settings() {
    let harness = TestHarness::new().await.unwrap();
    let app = app(&harness);

    let (status, body) = call(
        &app,
        "POST",
        "/sessions/create",
        Some(json!({
            "name": "with-hook",
            "settings": { "webhook": { "url": "https://hooks.example.com/wa", "events": ["Message", "Connected"] } }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["sessionId"].as_str().unwrap();
    let (_, hook) = call(&app, "GET", &format!("/sessions/{id}/webhook"), None).await;
    assert_eq!(hook["events"], json!(["Message", "Connected"]));
    assert_eq!(hook["hasSecret"], false);

    let (status, _) = call(
        &app,
        "POST",
        "/sessions/create",
        Some(json!({
            "name": "bad-hook",
            "settings": { "webhook": { "url": "https://hooks.example.com", "events": ["Nope"] } }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, list) = call(&app, "GET", "/sessions/list", None).await;
    assert_eq!(list["total"], 1);
}
