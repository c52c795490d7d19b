//! Document upload and lookup over HTTP.
//!
//! Run with: `cargo test -p scanvault-api --test documents_test`

mod helpers;

use std::time::Duration;

use axum::http::StatusCode;
use helpers::{default_limits, setup_test_app, setup_test_app_with, upload_form};
use scanvault_api::UploadLimits;
use scanvault_core::constants::EICAR;
use scanvault_core::{fingerprint_bytes, identifier_bytes};
use scanvault_services::MockScanner;
use serde_json::Value;

#[tokio::test]
async fn test_upload_then_analysis_completes() {
    let app = setup_test_app();
    let data = b"0123456789";

    let response = app
        .client()
        .post("/documents")
        .multipart(upload_form(data, "readme.txt", None))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    let id = body["id"].as_str().unwrap().to_string();
    assert_eq!(id, identifier_bytes(data));
    assert_eq!(body["message"], "document uploaded successfully.");

    app.wait_for_analyses().await;

    let response = app.client().get(&format!("/documents/{id}")).await;
    response.assert_status_ok();
    let body: Value = response.json();
    let document = &body["document"];
    assert_eq!(body["message"], "document found");
    assert_eq!(document["id"], id.as_str());
    assert_eq!(document["hash"], fingerprint_bytes(data).as_str());
    assert_eq!(document["hash_algo"], "SHA-256");
    assert_eq!(document["tag"], "readme.txt");
    assert_eq!(document["analyse_status"], "clean");

    let created_at = chrono::DateTime::parse_from_rfc3339(document["created_at"].as_str().unwrap())
        .unwrap();
    let analyzed_at =
        chrono::DateTime::parse_from_rfc3339(document["analyzed_at"].as_str().unwrap()).unwrap();
    assert!(created_at <= analyzed_at);
    assert_eq!(app.scanner.calls(), 1);
}

#[tokio::test]
async fn test_pending_document_omits_analyzed_at() {
    let app = setup_test_app_with(
        MockScanner::new().with_latency(Duration::from_millis(200)),
        default_limits(),
    );

    let response = app
        .client()
        .post("/documents")
        .multipart(upload_form(b"slow to analyze", "slow.bin", Some("slow")))
        .await;
    response.assert_status(StatusCode::CREATED);
    let id = response.json::<Value>()["id"].as_str().unwrap().to_string();

    let body: Value = app.client().get(&format!("/documents/{id}")).await.json();
    assert_eq!(body["document"]["analyse_status"], "pending");
    assert!(body["document"].get("analyzed_at").is_none());

    app.wait_for_analyses().await;
}

#[tokio::test]
async fn test_duplicate_upload_returns_existing_id() {
    let app = setup_test_app();
    let data = vec![7u8; 1024];

    let first = app
        .client()
        .post("/documents")
        .multipart(upload_form(&data, "a.bin", None))
        .await;
    first.assert_status(StatusCode::CREATED);
    let first_id = first.json::<Value>()["id"].as_str().unwrap().to_string();

    let second = app
        .client()
        .post("/documents")
        .multipart(upload_form(&data, "b.bin", Some("other tag")))
        .await;
    second.assert_status_ok();
    let body: Value = second.json();
    assert_eq!(body["id"], first_id.as_str());
    assert_eq!(body["message"], "document already exists.");

    app.wait_for_analyses().await;
    assert_eq!(app.metadata.len(), 1);
    assert_eq!(app.scanner.calls(), 1);
}

#[tokio::test]
async fn test_eicar_is_reported_infected() {
    let app = setup_test_app();

    let response = app
        .client()
        .post("/documents")
        .multipart(upload_form(EICAR, "eicar.com", None))
        .await;
    response.assert_status(StatusCode::CREATED);
    let id = response.json::<Value>()["id"].as_str().unwrap().to_string();

    app.wait_for_analyses().await;

    let body: Value = app.client().get(&format!("/documents/{id}")).await.json();
    assert_eq!(body["document"]["analyse_status"], "infected");
}

#[tokio::test]
async fn test_empty_file_is_rejected() {
    let app = setup_test_app();

    let response = app
        .client()
        .post("/documents")
        .multipart(upload_form(b"", "empty.txt", None))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "VALIDATION_FAILED");
    assert!(app.blobs.is_empty());
    assert!(app.metadata.is_empty());
}

#[tokio::test]
async fn test_missing_file_field_is_rejected() {
    let app = setup_test_app();

    let form = axum_test::multipart::MultipartForm::new().add_text("tag", "no file");
    let response = app.client().post("/documents").multipart(form).await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oversized_file_is_rejected() {
    let limits = UploadLimits {
        max_upload_size: 16,
        ..default_limits()
    };
    let app = setup_test_app_with(MockScanner::new(), limits);

    let response = app
        .client()
        .post("/documents")
        .multipart(upload_form(&[1u8; 64], "big.bin", None))
        .await;
    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    assert!(app.blobs.is_empty());
}

#[tokio::test]
async fn test_tag_defaults_to_filename_and_is_escaped() {
    let app = setup_test_app();

    let response = app
        .client()
        .post("/documents")
        .multipart(upload_form(b"first payload", "report.pdf", None))
        .await;
    let id = response.json::<Value>()["id"].as_str().unwrap().to_string();
    let body: Value = app.client().get(&format!("/documents/{id}")).await.json();
    assert_eq!(body["document"]["tag"], "report.pdf");

    let response = app
        .client()
        .post("/documents")
        .multipart(upload_form(b"second payload", "x.bin", Some("<b>bold</b>")))
        .await;
    let id = response.json::<Value>()["id"].as_str().unwrap().to_string();
    let body: Value = app.client().get(&format!("/documents/{id}")).await.json();
    assert_eq!(body["document"]["tag"], "&lt;b&gt;bold&lt;/b&gt;");

    app.wait_for_analyses().await;
}

#[tokio::test]
async fn test_unknown_document_is_not_found() {
    let app = setup_test_app();

    let response = app.client().get("/documents/does-not-exist").await;
    response.assert_status_not_found();
    let body: Value = response.json();
    assert_eq!(body["code"], "NOT_FOUND");
    assert_eq!(body["recoverable"], false);
}

#[tokio::test]
async fn test_upload_fails_when_blob_store_is_down() {
    let app = setup_test_app();
    app.blobs.set_online(false);

    let response = app
        .client()
        .post("/documents")
        .multipart(upload_form(b"nowhere to go", "x.bin", None))
        .await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert!(app.metadata.is_empty());
}
