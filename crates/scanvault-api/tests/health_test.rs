//! Ping, health and operator endpoints.
//!
//! Run with: `cargo test -p scanvault-api --test health_test`

mod helpers;

use axum::http::StatusCode;
use helpers::{default_limits, setup_test_app, setup_test_app_with, upload_form};
use serde_json::Value;
use scanvault_services::MockScanner;

#[tokio::test]
async fn test_root_redirects_to_ping() {
    let app = setup_test_app();

    let response = app.client().get("/").await;
    response.assert_status(StatusCode::PERMANENT_REDIRECT);
    assert_eq!(response.header("location"), "/ping");
}

#[tokio::test]
async fn test_ping_reports_version() {
    let app = setup_test_app();

    let response = app.client().get("/ping").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "PONG : everything is good");
    assert_eq!(body["version"], helpers::TEST_VERSION);
    assert_eq!(body["information"], helpers::TEST_INFORMATION);
}

#[tokio::test]
async fn test_ping_fails_when_scanner_is_down() {
    let app = setup_test_app();
    app.scanner.set_online(false);

    let response = app.client().get("/ping").await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert_eq!(body["message"], "service unavailable");
    assert_eq!(body["version"], helpers::TEST_VERSION);
}

#[tokio::test]
async fn test_health_reports_each_backend() {
    let app = setup_test_app();

    let response = app.client().get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["blob_store"], "healthy");
    assert_eq!(body["metadata_store"], "healthy");
    assert_eq!(body["scanner"], "healthy");
    assert_eq!(body["stalled_analyses"], 0);

    app.metadata.set_online(false);
    let response = app.client().get("/health").await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["blob_store"], "healthy");
    assert_ne!(body["metadata_store"], "healthy");
}

#[tokio::test]
async fn test_stalled_analyses_are_listed() {
    let scanner = MockScanner::new();
    scanner.set_always_fail(true);
    let app = setup_test_app_with(scanner, default_limits());

    let response = app
        .client()
        .post("/documents")
        .multipart(upload_form(b"never analyzed", "x.bin", None))
        .await;
    response.assert_status(StatusCode::CREATED);
    let id = response.json::<Value>()["id"].as_str().unwrap().to_string();

    app.wait_for_analyses().await;

    let response = app.client().get("/analyses/stalled").await;
    response.assert_status_ok();
    let stalled: Value = response.json();
    let stalled = stalled.as_array().unwrap();
    assert_eq!(stalled.len(), 1);
    assert_eq!(stalled[0]["document_id"], id.as_str());
    assert_eq!(stalled[0]["attempts"], 3);

    let body: Value = app.client().get(&format!("/documents/{id}")).await.json();
    assert_eq!(body["document"]["analyse_status"], "pending");

    let health: Value = app.client().get("/health").await.json();
    assert_eq!(health["stalled_analyses"], 1);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = setup_test_app();

    let response = app.client().get("/api/openapi.json").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body["paths"].get("/documents").is_some());
}
