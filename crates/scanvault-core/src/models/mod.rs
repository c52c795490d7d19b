//! Data models for the application

mod analysis;
mod document;

pub use analysis::{HealthReport, StalledAnalysis};
pub use document::{AnalysisStatus, Document, DocumentResponse, StatusTransitionError, Verdict};
