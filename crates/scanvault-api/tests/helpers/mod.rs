//! Test helpers: build the router on in-memory backends.
//!
//! Run from workspace root: `cargo test -p scanvault-api`.

use std::sync::Arc;
use std::time::Duration;

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use scanvault_api::setup::routes::setup_routes;
use scanvault_api::{AppState, UploadLimits};
use scanvault_db::MemoryMetadataStore;
use scanvault_services::{DocumentService, MockScanner, RetryPolicy};
use scanvault_storage::MemoryBlobStore;

pub const TEST_VERSION: &str = "1.0.0-test";
pub const TEST_INFORMATION: &str = "scanvault integration";

/// Test application: server plus handles on every backend.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub blobs: Arc<MemoryBlobStore>,
    pub metadata: Arc<MemoryMetadataStore>,
    pub scanner: Arc<MockScanner>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub async fn wait_for_analyses(&self) {
        self.state.service.wait_for_analyses().await;
    }
}

pub fn default_limits() -> UploadLimits {
    UploadLimits {
        max_upload_size: 1 << 20,
        upload_timeout: Duration::from_secs(10),
    }
}

pub fn setup_test_app() -> TestApp {
    setup_test_app_with(MockScanner::new(), default_limits())
}

pub fn setup_test_app_with(scanner: MockScanner, limits: UploadLimits) -> TestApp {
    let blobs = Arc::new(MemoryBlobStore::new());
    let metadata = Arc::new(MemoryMetadataStore::new());
    let scanner = Arc::new(scanner);

    let service = DocumentService::builder(blobs.clone(), metadata.clone(), scanner.clone())
        .capacity(4)
        .retry_policy(RetryPolicy::new(3, Duration::from_millis(1)))
        .version(TEST_VERSION)
        .information(TEST_INFORMATION)
        .build()
        .expect("Failed to build document service");

    let state = Arc::new(AppState::new(service, limits));
    let server =
        TestServer::new(setup_routes(state.clone())).expect("Failed to start test server");

    TestApp {
        server,
        state,
        blobs,
        metadata,
        scanner,
    }
}

/// A multipart form with one `file` part and an optional `tag`.
pub fn upload_form(data: &[u8], filename: &str, tag: Option<&str>) -> MultipartForm {
    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(data.to_vec())
            .file_name(filename)
            .mime_type("application/octet-stream"),
    );
    match tag {
        Some(tag) => form.add_text("tag", tag),
        None => form,
    }
}
