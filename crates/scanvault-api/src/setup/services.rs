//! Backend and orchestrator construction

use std::sync::Arc;

use anyhow::{Context, Result};
use scanvault_core::Config;
use scanvault_db::create_metadata_store;
use scanvault_services::{create_scanner, DocumentService, RetryPolicy};
use scanvault_storage::create_blob_store;

use crate::state::{AppState, UploadLimits};

/// Build the three backends and the orchestrator on top of them.
///
/// Every backend must answer a ping before the service is handed out.
pub async fn initialize_services(config: &Config) -> Result<Arc<AppState>> {
    let blobs = create_blob_store(config)
        .await
        .context("Failed to initialize blob store")?;
    let metadata = create_metadata_store(config)
        .await
        .context("Failed to initialize metadata store")?;
    let scanner = create_scanner(config).context("Failed to initialize scanner")?;

    let service = DocumentService::builder(blobs, metadata, scanner)
        .capacity(config.analysis_capacity())
        .retry_policy(RetryPolicy::new(
            config.analysis_attempts(),
            config.analysis_retry_delay(),
        ))
        .version(config.version())
        .information(config.information())
        .build()
        .context("Failed to build document service")?;

    service
        .ping()
        .await
        .context("Backends are not reachable at startup")?;

    tracing::info!(
        blob_backend = %config.blob_backend(),
        metadata_backend = %config.metadata_backend(),
        scanner_backend = %config.scanner_backend(),
        analysis_capacity = config.analysis_capacity(),
        analysis_attempts = config.analysis_attempts(),
        "Document service initialized"
    );

    Ok(Arc::new(AppState::new(
        service,
        UploadLimits::from_config(config),
    )))
}
