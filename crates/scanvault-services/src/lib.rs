//! Scanvault Services Library
//!
//! This crate provides the scanner abstraction with its ClamAV and mock
//! implementations, and the document orchestrator that ties the blob store,
//! metadata store and scanner together.

pub mod scanner;
pub mod service;

pub use scanner::{create_scanner, MockScanner, ScanError, Scanner};
#[cfg(feature = "clamav")]
pub use scanner::ClamAvScanner;
pub use service::{AdmissionControl, DocumentService, DocumentServiceBuilder, RetryPolicy};
