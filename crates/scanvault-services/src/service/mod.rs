//! Document orchestrator
//!
//! [`DocumentService`] is the single entry point for uploads and reads. It
//! writes the blob, registers the document and schedules its analysis on a
//! background task; the HTTP layer never talks to a backend directly.

mod admission;
mod analysis;
mod upload;

use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use scanvault_core::constants::{BACKEND_PING_TIMEOUT, DEFAULT_ANALYSIS_CAPACITY};
use scanvault_core::{AppError, Document, HealthReport, StalledAnalysis};
use scanvault_db::MetadataStore;
use scanvault_storage::BlobStore;
use tokio_util::task::TaskTracker;

pub use admission::AdmissionControl;
pub use analysis::RetryPolicy;

use analysis::{AnalysisTicket, AnalysisWorker};

use crate::scanner::Scanner;

/// Run a backend check with a deadline; "healthy", "timeout" or "{prefix}: {error}".
async fn run_check<F, E>(timeout: Duration, f: F, error_prefix: &str) -> String
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    match tokio::time::timeout(timeout, f).await {
        Ok(Ok(())) => "healthy".to_string(),
        Ok(Err(e)) => format!("{}: {}", error_prefix, e),
        Err(_) => "timeout".to_string(),
    }
}

struct Inner {
    worker: AnalysisWorker,
    tracker: TaskTracker,
    shutting_down: AtomicBool,
    version: String,
    information: String,
}

/// Upload, deduplication and analysis orchestrator.
///
/// Cheap to clone; clones share backends, admission slots and the
/// background task set.
#[derive(Clone)]
pub struct DocumentService {
    inner: Arc<Inner>,
}

pub struct DocumentServiceBuilder {
    blobs: Arc<dyn BlobStore>,
    metadata: Arc<dyn MetadataStore>,
    scanner: Arc<dyn Scanner>,
    admission: Option<AdmissionControl>,
    capacity: usize,
    retry: RetryPolicy,
    version: String,
    information: String,
}

impl DocumentServiceBuilder {
    /// Number of analyses allowed to run at once (default 128).
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Use an existing admission control instead of building one from
    /// [`DocumentServiceBuilder::capacity`].
    pub fn admission(mut self, admission: AdmissionControl) -> Self {
        self.admission = Some(admission);
        self
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn information(mut self, information: impl Into<String>) -> Self {
        self.information = information.into();
        self
    }

    /// Assemble the service. Backends are not contacted here.
    pub fn build(self) -> Result<DocumentService, AppError> {
        let admission = match self.admission {
            Some(admission) => admission,
            None => {
                if self.capacity == 0 {
                    return Err(AppError::ValidationFailed(
                        "analysis capacity must be at least 1".to_string(),
                    ));
                }
                AdmissionControl::new(self.capacity)
            }
        };
        if admission.capacity() == 0 {
            return Err(AppError::ValidationFailed(
                "analysis capacity must be at least 1".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(AppError::ValidationFailed(
                "analysis attempts must be at least 1".to_string(),
            ));
        }

        Ok(DocumentService {
            inner: Arc::new(Inner {
                worker: AnalysisWorker {
                    blobs: self.blobs,
                    metadata: self.metadata,
                    scanner: self.scanner,
                    admission,
                    retry: self.retry,
                    stalled: Arc::new(DashMap::new()),
                },
                tracker: TaskTracker::new(),
                shutting_down: AtomicBool::new(false),
                version: self.version,
                information: self.information,
            }),
        })
    }
}

impl DocumentService {
    pub fn builder(
        blobs: Arc<dyn BlobStore>,
        metadata: Arc<dyn MetadataStore>,
        scanner: Arc<dyn Scanner>,
    ) -> DocumentServiceBuilder {
        DocumentServiceBuilder {
            blobs,
            metadata,
            scanner,
            admission: None,
            capacity: DEFAULT_ANALYSIS_CAPACITY,
            retry: RetryPolicy::default(),
            version: String::new(),
            information: String::new(),
        }
    }

    fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.inner.worker.blobs
    }

    fn metadata(&self) -> &Arc<dyn MetadataStore> {
        &self.inner.worker.metadata
    }

    fn scanner(&self) -> &Arc<dyn Scanner> {
        &self.inner.worker.scanner
    }

    /// Spawn the analysis task for `id`; it waits for the ticket.
    fn schedule_analysis(&self, id: &str) -> AnalysisTicket {
        let (ticket, released) = AnalysisTicket::new();
        let worker = self.inner.worker.clone();
        self.inner.tracker.spawn(worker.run(id.to_string(), released));
        ticket
    }

    /// Best-effort blob removal; a missing blob is fine.
    async fn discard_blob(&self, id: &str) {
        match self.blobs().delete(id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => tracing::warn!(document_id = %id, error = %e, "Failed to delete blob"),
        }
    }

    pub async fn get_document(&self, id: &str) -> Result<Document, AppError> {
        match self.metadata().get(id).await {
            Ok(doc) => Ok(doc),
            Err(e) if e.is_not_found() => {
                tracing::debug!(document_id = %id, "Document not found");
                Err(AppError::NotFound(format!("document id={id}")))
            }
            Err(e) => Err(e.into_app_error(format!("get document id={id}"))),
        }
    }

    /// Check every backend concurrently; all failures are reported together.
    pub async fn ping(&self) -> Result<(), AppError> {
        let (blobs, metadata, scanner) = self.check_backends().await;
        let failures: Vec<String> = [
            ("blob store", blobs),
            ("metadata store", metadata),
            ("scanner", scanner),
        ]
        .into_iter()
        .filter(|(_, status)| status != "healthy")
        .map(|(name, status)| format!("{name}: {status}"))
        .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(AppError::BackendUnavailable(failures.join("; ")))
        }
    }

    pub async fn health(&self) -> HealthReport {
        let (blob_store, metadata_store, scanner) = self.check_backends().await;
        let healthy = [&blob_store, &metadata_store, &scanner]
            .iter()
            .all(|status| status.as_str() == "healthy");

        HealthReport {
            status: if healthy { "healthy" } else { "degraded" }.to_string(),
            version: self.inner.version.clone(),
            blob_store,
            metadata_store,
            scanner,
            analyses_in_flight: self.analyses_in_flight(),
            stalled_analyses: self.inner.worker.stalled.len(),
        }
    }

    async fn check_backends(&self) -> (String, String, String) {
        tokio::join!(
            run_check(BACKEND_PING_TIMEOUT, self.blobs().ping(), "error"),
            run_check(BACKEND_PING_TIMEOUT, self.metadata().ping(), "error"),
            run_check(BACKEND_PING_TIMEOUT, self.scanner().ping(), "error"),
        )
    }

    pub fn version(&self) -> &str {
        &self.inner.version
    }

    pub fn information(&self) -> &str {
        &self.inner.information
    }

    /// Documents whose analysis exhausted its attempts, oldest first.
    pub fn stalled_analyses(&self) -> Vec<StalledAnalysis> {
        let mut stalled: Vec<StalledAnalysis> = self
            .inner
            .worker
            .stalled
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        stalled.sort_by(|a, b| a.failed_at.cmp(&b.failed_at));
        stalled
    }

    /// Admission slots currently held by running analyses.
    pub fn analyses_in_flight(&self) -> usize {
        self.inner.worker.admission.in_flight()
    }

    /// Scheduled analysis tasks that have not finished, including ones
    /// still waiting for a slot or sleeping between attempts. Uploads being
    /// committed count too.
    pub fn analyses_scheduled(&self) -> usize {
        self.inner.tracker.len()
    }

    /// Wait until every analysis scheduled so far has finished.
    pub async fn wait_for_analyses(&self) {
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
        if !self.inner.shutting_down.load(Ordering::SeqCst) {
            self.inner.tracker.reopen();
        }
    }

    /// Wait up to `grace` for running analyses. Returns whether all finished.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.inner.shutting_down.store(true, Ordering::SeqCst);
        self.inner.tracker.close();
        let drained = tokio::time::timeout(grace, self.inner.tracker.wait())
            .await
            .is_ok();
        if !drained {
            tracing::warn!(
                remaining = self.inner.tracker.len(),
                "Shutdown grace period elapsed with analyses still running"
            );
        }
        drained
    }
}
