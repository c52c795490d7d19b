//! Error types module
//!
//! All failures surfaced by the orchestrator are unified under [`AppError`].
//! Backend crates define their own error enums and convert into it; the
//! orchestrator attaches the context of the operation that failed.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected outcomes like validation failures or misses
    Debug,
    /// Warning level - for recoverable issues like an unreachable dependency
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "STORAGE_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// Identical content is already known; `id` is its canonical identifier.
    #[error("Document already exists: id={id}")]
    AlreadyExists { id: String },

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[error("Deadline exceeded: {0}")]
    Timeout(String),

    #[error("Blob store error: {message}")]
    Storage {
        message: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Metadata store error: {message}")]
    Metadata {
        message: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the document ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::AlreadyExists { .. } => (
            409,
            "ALREADY_EXISTS",
            false,
            Some("Use the returned document ID"),
            false,
            LogLevel::Debug,
        ),
        AppError::BackendUnavailable(_) => (
            503,
            "BACKEND_UNAVAILABLE",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Warn,
        ),
        AppError::ValidationFailed(_) => (
            400,
            "VALIDATION_FAILED",
            false,
            Some("Check the uploaded file and tag, then try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::PayloadTooLarge(_) => (
            413,
            "PAYLOAD_TOO_LARGE",
            false,
            Some("Reduce file size"),
            false,
            LogLevel::Debug,
        ),
        AppError::Timeout(_) => (
            504,
            "DEADLINE_EXCEEDED",
            true,
            Some("Retry the upload"),
            false,
            LogLevel::Warn,
        ),
        AppError::Storage { .. } => (
            500,
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Metadata { .. } => (
            500,
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::NotFound(_) => "NotFound",
            AppError::AlreadyExists { .. } => "AlreadyExists",
            AppError::BackendUnavailable(_) => "BackendUnavailable",
            AppError::ValidationFailed(_) => "ValidationFailed",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::Timeout(_) => "Timeout",
            AppError::Storage { .. } => "Storage",
            AppError::Metadata { .. } => "Metadata",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Canonical identifier carried by `AlreadyExists`.
    pub fn existing_id(&self) -> Option<&str> {
        match self {
            AppError::AlreadyExists { id } => Some(id),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::NotFound(_) => "Document not found".to_string(),
            AppError::AlreadyExists { .. } => "Document already exists".to_string(),
            AppError::BackendUnavailable(_) => "Service unavailable".to_string(),
            AppError::ValidationFailed(ref msg) => msg.clone(),
            AppError::PayloadTooLarge(ref msg) => msg.clone(),
            AppError::Timeout(_) => "Upload timed out".to_string(),
            AppError::Storage { .. } => "Failed to access storage".to_string(),
            AppError::Metadata { .. } => "Failed to access database".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_exists_carries_id() {
        let err = AppError::AlreadyExists {
            id: "kAFQmDzST7DWlj99KOF_cg".to_string(),
        };
        assert_eq!(err.existing_id(), Some("kAFQmDzST7DWlj99KOF_cg"));
        assert_eq!(err.log_level(), LogLevel::Debug);
        assert!(AppError::NotFound("x".into()).existing_id().is_none());
    }

    #[test]
    fn test_not_found_is_quiet() {
        let err = AppError::NotFound("id=abc".to_string());
        assert!(err.is_not_found());
        assert_eq!(err.http_status_code(), 404);
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_backend_errors_are_sensitive() {
        let err = AppError::Storage {
            message: "save id=abc".to_string(),
            source: anyhow::anyhow!("connection refused"),
        };
        assert!(err.is_sensitive());
        assert_eq!(err.error_code(), "STORAGE_ERROR");
        assert_eq!(err.client_message(), "Failed to access storage");
    }

    #[test]
    fn test_detailed_message_includes_source_chain() {
        let err = AppError::Metadata {
            message: "get_by_fingerprint".to_string(),
            source: anyhow::anyhow!("connection reset"),
        };
        let details = err.detailed_message();
        assert!(details.contains("get_by_fingerprint"));
        assert!(details.contains("Caused by: connection reset"));
    }

    #[test]
    fn test_validation_message_passes_through() {
        let err = AppError::ValidationFailed("Upload is empty".to_string());
        assert_eq!(err.client_message(), "Upload is empty");
        assert_eq!(err.http_status_code(), 400);
    }
}
