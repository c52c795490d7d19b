//! Metadata store abstraction trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scanvault_core::{AnalysisStatus, AppError, Document, StatusTransitionError};
use thiserror::Error;

/// Metadata operation errors
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Document not found: {0}")]
    NotFound(String),

    /// Another record already holds this identifier or fingerprint.
    #[error("Document already exists: {0}")]
    AlreadyExists(String),

    #[error(transparent)]
    InvalidTransition(#[from] StatusTransitionError),

    #[error("Metadata store unavailable: {0}")]
    Unavailable(String),

    #[error("Metadata store error: {0}")]
    Backend(#[source] anyhow::Error),
}

impl MetadataError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, MetadataError::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, MetadataError::AlreadyExists(_))
    }

    /// Convert into an [`AppError`] carrying the failed operation as context.
    pub fn into_app_error(self, context: impl Into<String>) -> AppError {
        let context = context.into();
        match self {
            MetadataError::NotFound(what) => AppError::NotFound(format!("{context}: {what}")),
            MetadataError::Unavailable(msg) => {
                AppError::BackendUnavailable(format!("{context}: metadata store: {msg}"))
            }
            other => AppError::Metadata {
                message: context,
                source: anyhow::Error::new(other),
            },
        }
    }
}

impl From<sqlx::Error> for MetadataError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => MetadataError::NotFound("row not found".to_string()),
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                MetadataError::AlreadyExists(db_err.message().to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                MetadataError::Unavailable(err.to_string())
            }
            other => MetadataError::Backend(anyhow::Error::new(other)),
        }
    }
}

impl From<MetadataError> for AppError {
    fn from(err: MetadataError) -> Self {
        err.into_app_error("metadata store")
    }
}

/// Result type for metadata operations
pub type MetadataResult<T> = Result<T, MetadataError>;

/// Persistent registry of documents
///
/// Identifiers and fingerprints are both unique. A document's status only
/// ever moves from pending to a verdict, and implementations must enforce it.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert a new record. A duplicate id or fingerprint is `AlreadyExists`.
    async fn save(&self, doc: &Document) -> MetadataResult<()>;

    async fn get(&self, id: &str) -> MetadataResult<Document>;

    async fn get_by_fingerprint(&self, fingerprint: &str) -> MetadataResult<Document>;

    /// Record a verdict. Only a pending document accepts one; anything else
    /// is `InvalidTransition`.
    async fn update_status(
        &self,
        id: &str,
        status: AnalysisStatus,
        analyzed_at: DateTime<Utc>,
    ) -> MetadataResult<()>;

    async fn delete(&self, id: &str) -> MetadataResult<()>;

    async fn ping(&self) -> MetadataResult<()>;

    /// Short backend name for logs and health reports.
    fn backend_name(&self) -> &'static str;
}
