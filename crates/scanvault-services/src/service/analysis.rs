//! Background analysis of uploaded documents.
//!
//! Each scheduled analysis is one task. It waits until the upload releases
//! it, takes an admission slot, then scans the blob with linear back-off
//! between attempts. Dropping the [`AnalysisTicket`] before release cancels
//! the task without scanning.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;
use scanvault_core::constants::{DEFAULT_ANALYSIS_ATTEMPTS, DEFAULT_RETRY_BASE_DELAY};
use scanvault_core::{AnalysisStatus, ByteReader, StalledAnalysis};
use scanvault_db::{MetadataError, MetadataStore};
use scanvault_storage::BlobStore;
use tokio::io::AsyncReadExt;
use tokio::sync::oneshot;

use super::admission::AdmissionControl;
use crate::scanner::Scanner;

/// How many times an analysis is attempted and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_ANALYSIS_ATTEMPTS,
            base_delay: DEFAULT_RETRY_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Wait after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// Handle to a scheduled analysis that has not started yet.
///
/// [`AnalysisTicket::release`] lets it run; dropping the ticket cancels it.
#[derive(Debug)]
pub(crate) struct AnalysisTicket {
    release: oneshot::Sender<()>,
}

impl AnalysisTicket {
    pub(crate) fn new() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (Self { release: tx }, rx)
    }

    pub(crate) fn release(self) {
        // The task only goes away early if the runtime is shutting down.
        let _ = self.release.send(());
    }
}

enum AttemptError {
    /// Another analysis already recorded a verdict.
    AlreadyDecided,
    Retryable(String),
}

/// Everything one analysis task needs; cheap to clone.
#[derive(Clone)]
pub(crate) struct AnalysisWorker {
    pub(crate) blobs: Arc<dyn BlobStore>,
    pub(crate) metadata: Arc<dyn MetadataStore>,
    pub(crate) scanner: Arc<dyn Scanner>,
    pub(crate) admission: AdmissionControl,
    pub(crate) retry: RetryPolicy,
    pub(crate) stalled: Arc<DashMap<String, StalledAnalysis>>,
}

impl AnalysisWorker {
    pub(crate) async fn run(self, id: String, released: oneshot::Receiver<()>) {
        if released.await.is_err() {
            tracing::debug!(document_id = %id, "Analysis cancelled before release");
            return;
        }

        let _permit = match self.admission.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                tracing::warn!(document_id = %id, "Admission closed, analysis not started");
                return;
            }
        };

        let data = match self.fetch(&id).await {
            Ok(data) => data,
            Err(e) => {
                tracing::error!(document_id = %id, error = %e, "Failed to fetch blob for analysis");
                self.record_stalled(&id, 0, e);
                return;
            }
        };

        let max_attempts = self.retry.max_attempts;
        let mut last_error = String::new();
        for attempt in 1..=max_attempts {
            match self.attempt(&id, data.clone()).await {
                Ok(status) => {
                    tracing::info!(document_id = %id, %status, attempt, "Analysis completed");
                    self.discard_blob(&id).await;
                    return;
                }
                Err(AttemptError::AlreadyDecided) => {
                    tracing::debug!(document_id = %id, "Verdict already recorded elsewhere");
                    self.discard_blob(&id).await;
                    return;
                }
                Err(AttemptError::Retryable(e)) => {
                    tracing::warn!(
                        document_id = %id,
                        attempt,
                        max_attempts,
                        error = %e,
                        "Analysis attempt failed"
                    );
                    last_error = e;
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(self.retry.delay_after(attempt)).await;
            }
        }

        tracing::error!(
            document_id = %id,
            attempts = max_attempts,
            error = %last_error,
            "Analysis gave up; document stays pending"
        );
        self.record_stalled(&id, max_attempts, last_error);
    }

    /// Buffer the blob once so every attempt gets a fresh reader.
    async fn fetch(&self, id: &str) -> Result<Bytes, String> {
        let mut reader = self
            .blobs
            .get(id)
            .await
            .map_err(|e| format!("get blob: {e}"))?;
        let mut buffer = Vec::new();
        reader
            .read_to_end(&mut buffer)
            .await
            .map_err(|e| format!("read blob: {e}"))?;
        Ok(Bytes::from(buffer))
    }

    async fn attempt(&self, id: &str, data: Bytes) -> Result<AnalysisStatus, AttemptError> {
        let reader: ByteReader = Box::pin(Cursor::new(data));
        let deadline = self.scanner.timeout();

        let verdict = match tokio::time::timeout(deadline, self.scanner.analyze(reader)).await {
            Ok(Ok(verdict)) => verdict,
            Ok(Err(e)) => return Err(AttemptError::Retryable(format!("scanner: {e}"))),
            Err(_) => {
                return Err(AttemptError::Retryable(format!(
                    "scanner timed out after {}ms",
                    deadline.as_millis()
                )))
            }
        };

        let status = AnalysisStatus::from(verdict);
        match self.metadata.update_status(id, status, Utc::now()).await {
            Ok(()) => Ok(status),
            Err(MetadataError::InvalidTransition(_)) => Err(AttemptError::AlreadyDecided),
            Err(e) => Err(AttemptError::Retryable(format!("update status: {e}"))),
        }
    }

    async fn discard_blob(&self, id: &str) {
        match self.blobs.delete(id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                tracing::warn!(document_id = %id, error = %e, "Failed to delete analyzed blob");
            }
        }
    }

    fn record_stalled(&self, id: &str, attempts: u32, last_error: String) {
        self.stalled.insert(
            id.to_string(),
            StalledAnalysis {
                document_id: id.to_string(),
                attempts,
                last_error,
                failed_at: Utc::now(),
            },
        );
    }
}
