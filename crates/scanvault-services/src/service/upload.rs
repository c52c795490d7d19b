use std::io::SeekFrom;

use scanvault_core::validation::{truncate_tag, validate_tag, validate_upload_size};
use scanvault_core::{fingerprint, identifier, AppError, Document};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};

use super::analysis::AnalysisTicket;
use super::DocumentService;

impl DocumentService {
    /// Store a new document and schedule its analysis.
    ///
    /// Exactly `size` bytes are read from the current position of `data`.
    /// Returns the document identifier. Content that is already registered
    /// yields [`AppError::AlreadyExists`] carrying the existing identifier.
    pub async fn upload<R>(&self, data: &mut R, size: u64, tag: &str) -> Result<String, AppError>
    where
        R: AsyncRead + AsyncSeek + Unpin + Send,
    {
        validate_upload_size(size)?;
        validate_tag(tag)?;

        let start = data.stream_position().await?;

        let hashed = fingerprint((&mut *data).take(size)).await?;
        if hashed.len < size {
            return Err(AppError::ValidationFailed(format!(
                "Upload ended after {} of {} declared bytes",
                hashed.len, size
            )));
        }
        let fingerprint = hashed.value;

        match self.metadata().get_by_fingerprint(&fingerprint).await {
            Ok(existing) => {
                tracing::debug!(document_id = %existing.id, "Content already registered");
                return Err(AppError::AlreadyExists { id: existing.id });
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into_app_error("look up document by fingerprint")),
        }

        data.seek(SeekFrom::Start(start)).await?;
        let id = identifier((&mut *data).take(size)).await?.value;

        data.seek(SeekFrom::Start(start)).await?;
        self.blobs()
            .save(&id, size, data)
            .await
            .map_err(|e| e.into_app_error(format!("save blob id={id}")))?;

        let mut doc = Document::new(id.as_str(), fingerprint.as_str(), truncate_tag(tag));

        // Identical content may have been analyzed since the first lookup.
        let ticket = match self.metadata().get_by_fingerprint(&fingerprint).await {
            Ok(prior) if prior.status.is_terminal() => {
                tracing::debug!(
                    document_id = %id,
                    prior_id = %prior.id,
                    status = %prior.status,
                    "Reusing verdict of identical content"
                );
                doc = doc.inherit_verdict(&prior);
                None
            }
            Ok(_) => Some(self.schedule_analysis(&id)),
            Err(e) if e.is_not_found() => Some(self.schedule_analysis(&id)),
            Err(e) => {
                tracing::warn!(
                    document_id = %id,
                    error = %e,
                    "Fingerprint re-check failed, scheduling analysis"
                );
                Some(self.schedule_analysis(&id))
            }
        };

        // The commit runs on the tracker so a dropped request cannot land
        // between the save and the ticket release.
        let service = self.clone();
        self.inner
            .tracker
            .spawn(async move { service.commit(doc, size, ticket).await })
            .await
            .map_err(|e| AppError::Internal(format!("commit task failed: {e}")))?
    }

    /// Register `doc` and hand its analysis ticket over to the worker.
    async fn commit(
        &self,
        doc: Document,
        size: u64,
        ticket: Option<AnalysisTicket>,
    ) -> Result<String, AppError> {
        let id = doc.id.clone();
        match self.metadata().save(&doc).await {
            Ok(()) => {
                match ticket {
                    Some(ticket) => ticket.release(),
                    None => self.discard_blob(&id).await,
                }
                tracing::info!(
                    document_id = %id,
                    size_bytes = size,
                    status = %doc.status,
                    "Document uploaded"
                );
                Ok(id)
            }
            Err(e) if e.is_already_exists() => {
                drop(ticket);
                let canonical = match self.metadata().get_by_fingerprint(&doc.fingerprint).await {
                    Ok(existing) => existing.id,
                    Err(lookup_err) => {
                        tracing::warn!(
                            document_id = %id,
                            error = %lookup_err,
                            "Could not resolve the existing document, returning own identifier"
                        );
                        id.clone()
                    }
                };
                if doc.status.is_terminal() {
                    self.discard_blob(&id).await;
                }
                tracing::debug!(document_id = %canonical, "Concurrent upload of identical content");
                Err(AppError::AlreadyExists { id: canonical })
            }
            Err(e) => {
                drop(ticket);
                tracing::warn!(
                    document_id = %id,
                    error = %e,
                    "Metadata save failed, blob left in place"
                );
                Err(e.into_app_error(format!("save document id={id}")))
            }
        }
    }
}
