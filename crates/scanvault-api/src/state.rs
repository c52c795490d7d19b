//! Shared application state handed to every handler.

use std::time::Duration;

use scanvault_core::Config;
use scanvault_services::DocumentService;

/// Upload limits applied by the HTTP layer before the orchestrator runs.
#[derive(Clone, Copy, Debug)]
pub struct UploadLimits {
    pub max_upload_size: u64,
    pub upload_timeout: Duration,
}

impl UploadLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_upload_size: config.max_upload_size(),
            upload_timeout: config.upload_timeout(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub service: DocumentService,
    pub limits: UploadLimits,
}

impl AppState {
    pub fn new(service: DocumentService, limits: UploadLimits) -> Self {
        Self { service, limits }
    }
}
