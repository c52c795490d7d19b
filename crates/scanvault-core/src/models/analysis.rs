use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A document whose analysis gave up after exhausting its retry budget.
///
/// The document stays pending and its blob is retained until an operator
/// acts on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StalledAnalysis {
    pub document_id: String,
    /// Scan attempts made; 0 when the blob could not be fetched at all.
    pub attempts: u32,
    pub last_error: String,
    pub failed_at: DateTime<Utc>,
}

/// Reachability of every backend plus analysis pipeline counters.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthReport {
    /// "healthy" when every backend answered, "degraded" otherwise.
    pub status: String,
    pub version: String,
    /// "healthy", "timeout" or the failure message.
    pub blob_store: String,
    pub metadata_store: String,
    pub scanner: String,
    pub analyses_in_flight: usize,
    pub stalled_analyses: usize,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}
