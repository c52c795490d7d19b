use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::constants::FINGERPRINT_ALGORITHM;

/// Analysis lifecycle of a document.
///
/// `Pending` is the only non-terminal state. A document moves out of it once
/// and never comes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Pending,
    Clean,
    Infected,
}

impl AnalysisStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AnalysisStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Clean => "clean",
            AnalysisStatus::Infected => "infected",
        }
    }
}

impl Display for AnalysisStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(AnalysisStatus::Pending),
            "clean" => Ok(AnalysisStatus::Clean),
            "infected" => Ok(AnalysisStatus::Infected),
            _ => Err(anyhow::anyhow!("Invalid analysis status: {}", s)),
        }
    }
}

/// A scanner's answer. Only terminal outcomes are representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Clean,
    Infected,
}

impl From<Verdict> for AnalysisStatus {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Clean => AnalysisStatus::Clean,
            Verdict::Infected => AnalysisStatus::Infected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid status transition for document {id}: {from} -> {to}")]
pub struct StatusTransitionError {
    pub id: String,
    pub from: AnalysisStatus,
    pub to: AnalysisStatus,
}

/// One uploaded artifact and its analysis lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub fingerprint: String,
    pub tag: String,
    pub status: AnalysisStatus,
    pub analyzed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// A fresh, pending document stamped with the current time.
    pub fn new(id: impl Into<String>, fingerprint: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fingerprint: fingerprint.into(),
            tag: tag.into(),
            status: AnalysisStatus::Pending,
            analyzed_at: None,
            created_at: Utc::now(),
        }
    }

    /// Carry over the verdict of `prior` when it already has one.
    ///
    /// Used when identical content was analyzed before; a pending `prior`
    /// leaves `self` untouched.
    pub fn inherit_verdict(mut self, prior: &Document) -> Self {
        if prior.status.is_terminal() {
            self.status = prior.status;
            self.analyzed_at = prior.analyzed_at;
        }
        self
    }

    pub fn is_pending(&self) -> bool {
        self.status == AnalysisStatus::Pending
    }

    /// Record the outcome of an analysis.
    ///
    /// Only `Pending -> Clean | Infected` is accepted; `analyzed_at` is set
    /// together with the status.
    pub fn apply_status(
        &mut self,
        status: AnalysisStatus,
        analyzed_at: DateTime<Utc>,
    ) -> Result<(), StatusTransitionError> {
        if self.status.is_terminal() || !status.is_terminal() {
            return Err(StatusTransitionError {
                id: self.id.clone(),
                from: self.status,
                to: status,
            });
        }
        self.status = status;
        self.analyzed_at = Some(analyzed_at);
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocumentResponse {
    pub id: String,
    pub hash: String,
    pub hash_algo: String,
    pub tag: String,
    pub analyse_status: AnalysisStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analyzed_at: Option<String>,
    pub created_at: String,
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        DocumentResponse {
            id: doc.id,
            hash: doc.fingerprint,
            hash_algo: FINGERPRINT_ALGORITHM.to_string(),
            tag: html_escape::encode_safe(&doc.tag).into_owned(),
            analyse_status: doc.status,
            analyzed_at: doc
                .analyzed_at
                .filter(|_| doc.status.is_terminal())
                .map(|t| t.to_rfc3339()),
            created_at: doc.created_at.to_rfc3339(),
        }
    }
}
