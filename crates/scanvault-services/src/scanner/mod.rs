//! Scanner abstraction
//!
//! A scanner inspects a byte stream and answers with a [`Verdict`]. An error
//! always means the scan itself did not complete; it is never a verdict.

#[cfg(feature = "clamav")]
mod clamav;
mod mock;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use scanvault_core::{ByteReader, Config, ScannerBackend, Verdict};
use thiserror::Error;

#[cfg(feature = "clamav")]
pub use clamav::ClamAvScanner;
pub use mock::MockScanner;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Scanner unavailable: {0}")]
    Unavailable(String),

    #[error("Scan failed: {0}")]
    Failed(String),

    #[error("Failed to read content: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait Scanner: Send + Sync {
    /// Scan everything `data` yields.
    async fn analyze(&self, data: ByteReader) -> Result<Verdict, ScanError>;

    /// Cheap reachability check.
    async fn ping(&self) -> Result<(), ScanError>;

    /// Deadline callers apply to a single [`Scanner::analyze`] call.
    fn timeout(&self) -> Duration;

    fn name(&self) -> &'static str;
}

/// Create a scanner based on configuration
pub fn create_scanner(config: &Config) -> anyhow::Result<Arc<dyn Scanner>> {
    match config.scanner_backend() {
        #[cfg(feature = "clamav")]
        ScannerBackend::ClamAv => Ok(Arc::new(ClamAvScanner::new(
            config.clamav_host().to_string(),
            config.clamav_port(),
            config.clamav_timeout(),
        )?)),

        #[cfg(not(feature = "clamav"))]
        ScannerBackend::ClamAv => Err(anyhow::anyhow!(
            "ClamAV scanner not available (clamav feature not enabled)"
        )),

        ScannerBackend::Mock => {
            tracing::warn!("Using mock scanner; only the EICAR signature is detected");
            Ok(Arc::new(MockScanner::new().with_timeout(config.clamav_timeout())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_mock_scanner() {
        let config = Config::from_lookup(|key| match key {
            "SCANVAULT_VERSION" => Some("test".to_string()),
            "SCANNER_BACKEND" => Some("mock".to_string()),
            "CLAMAV_TIMEOUT_SECS" => Some("7".to_string()),
            _ => None,
        })
        .unwrap();

        let scanner = create_scanner(&config).unwrap();
        assert_eq!(scanner.name(), "mock");
        assert_eq!(scanner.timeout(), Duration::from_secs(7));
    }
}
