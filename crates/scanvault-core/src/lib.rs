//! Scanvault Core Library
//!
//! This crate provides the domain model, content identity, error types,
//! configuration, and validation shared by every Scanvault component.

pub mod backend_types;
pub mod config;
pub mod constants;
pub mod error;
pub mod identity;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use backend_types::{BlobBackend, ByteReader, MetadataBackend, ScannerBackend};
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use identity::{fingerprint, fingerprint_bytes, identifier, identifier_bytes, Hashed};
pub use models::{
    AnalysisStatus, Document, DocumentResponse, HealthReport, StalledAnalysis,
    StatusTransitionError, Verdict,
};
