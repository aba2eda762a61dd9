//! Ingestion flow: extract, chunk, embed, index.

use tracing::{info, warn};
use uuid::Uuid;

use super::Pipeline;
use crate::chunking::chunk_document;
use crate::error::{PipelineError, Result};
use crate::index::index_chunks;
use crate::traits::{HybridIndex, ReasoningBackend, Store, TextExtractor};
use crate::types::{Document, ProcessingStatus};

impl<S, I, B, X> Pipeline<S, I, B, X>
where
    S: Store + 'static,
    I: HybridIndex + 'static,
    B: ReasoningBackend + 'static,
    X: TextExtractor + 'static,
{
    /// Ingest a pending document: extract its text, chunk it, embed and
    /// index the chunks.
    ///
    /// Extraction failures and empty content fail the document directly
    /// from `Pending` with a human-readable reason; the document only
    /// enters `Processing` once there is usable text. Partial indexing
    /// fails the document with a count of what made it in.
    pub async fn run_ingestion(&self, document_id: Uuid) -> Result<Document> {
        let mut document = self
            .store
            .get_document(document_id)
            .await?
            .ok_or(PipelineError::DocumentNotFound { id: document_id })?;

        if document.status != ProcessingStatus::Pending {
            return Err(PipelineError::InvalidState {
                reason: format!(
                    "document {} is {:?}, only pending documents can be ingested",
                    document_id, document.status
                ),
            });
        }

        // Extract before entering Processing: a document with no usable
        // content goes straight from Pending to Failed.
        let segments = match self.extractor.extract(&document).await {
            Ok(segments) => segments,
            Err(err) => {
                warn!(%document_id, error = %err, "text extraction failed");
                document.mark_failed(err.user_reason());
                self.store.put_document(&document).await?;
                return Ok(document);
            }
        };
        if segments.iter().all(|s| s.text.trim().is_empty()) {
            document.mark_failed("empty content");
            self.store.put_document(&document).await?;
            return Ok(document);
        }

        document.mark_processing();
        self.store.put_document(&document).await?;

        let chunks = chunk_document(&document, &segments, &self.config.chunking);
        self.store.put_chunks(&chunks).await?;

        let outcome = match index_chunks(
            &*self.index,
            &*self.backend,
            &document,
            &chunks,
            &self.config.analysis,
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                document.mark_failed(format!("indexing failed: {err}"));
                self.store.put_document(&document).await?;
                return Err(err);
            }
        };

        if outcome.is_complete() {
            document.mark_completed(chunks.len());
            info!(%document_id, chunks = chunks.len(), "document ingested");
        } else {
            document.mark_failed(format!(
                "indexed {} of {} chunks",
                outcome.indexed,
                chunks.len()
            ));
            warn!(
                %document_id,
                indexed = outcome.indexed,
                total = chunks.len(),
                "document partially indexed, marked failed"
            );
        }
        self.store.put_document(&document).await?;
        Ok(document)
    }

    /// Reset a completed or failed document and ingest it again.
    ///
    /// Derived chunks and index entries are invalidated before the rerun
    /// so no stale data survives a strategy or extractor change.
    pub async fn reprocess_document(&self, document_id: Uuid) -> Result<Document> {
        let mut document = self
            .store
            .get_document(document_id)
            .await?
            .ok_or(PipelineError::DocumentNotFound { id: document_id })?;

        match document.status {
            ProcessingStatus::Completed | ProcessingStatus::Failed => {}
            status => {
                return Err(PipelineError::InvalidState {
                    reason: format!(
                        "document {document_id} is {status:?}, only completed or failed documents can be reprocessed"
                    ),
                });
            }
        }

        self.store.delete_chunks(document_id).await?;
        self.index.remove_document(document_id).await?;
        document.reset_for_reprocess();
        self.store.put_document(&document).await?;
        info!(%document_id, "document reset for reprocessing");

        self.run_ingestion(document_id).await
    }
}
