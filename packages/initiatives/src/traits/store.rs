//! Storage seams for documents, chunks, initiatives, insights and jobs.
//!
//! Split into focused traits so collaborators only depend on what they
//! touch; [`Store`] composes them for the pipeline itself.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::types::{AnalysisJob, CanonicalInitiative, Chunk, Document, Insight};

/// Storage of documents and their derived chunks.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert or update a document.
    async fn put_document(&self, document: &Document) -> Result<()>;

    /// Fetch a document by id.
    async fn get_document(&self, id: Uuid) -> Result<Option<Document>>;

    /// All documents for a company.
    async fn documents_for_company(&self, company_id: Uuid) -> Result<Vec<Document>>;

    /// Store a document's chunks.
    async fn put_chunks(&self, chunks: &[Chunk]) -> Result<()>;

    /// A document's chunks in ordinal order.
    async fn chunks_for_document(&self, document_id: Uuid) -> Result<Vec<Chunk>>;

    /// Delete all chunks derived from a document.
    async fn delete_chunks(&self, document_id: Uuid) -> Result<()>;
}

/// Storage of canonical initiatives and document insights.
#[async_trait]
pub trait InitiativeStore: Send + Sync {
    /// Insert or update a canonical initiative (keyed by id).
    async fn put_initiative(&self, initiative: &CanonicalInitiative) -> Result<()>;

    /// All canonical initiatives for a company.
    async fn initiatives_for_company(&self, company_id: Uuid) -> Result<Vec<CanonicalInitiative>>;

    /// Store a document insight.
    async fn put_insight(&self, insight: &Insight) -> Result<()>;

    /// Insights extracted from a document.
    async fn insights_for_document(&self, document_id: Uuid) -> Result<Vec<Insight>>;
}

/// Storage of analysis-run jobs.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert or replace a job.
    async fn put_job(&self, job: &AnalysisJob) -> Result<()>;

    /// Fetch a job by id.
    async fn get_job(&self, id: Uuid) -> Result<Option<AnalysisJob>>;

    /// Mutate a job atomically under the store's lock and return the
    /// updated record. Errors with `JobNotFound` if the id is unknown.
    async fn update_job(
        &self,
        id: Uuid,
        update: Box<dyn for<'a> FnOnce(&'a mut AnalysisJob) + Send>,
    ) -> Result<AnalysisJob>;
}

/// Everything the pipeline needs from storage.
pub trait Store: DocumentStore + InitiativeStore + JobStore {}

impl<T: DocumentStore + InitiativeStore + JobStore> Store for T {}
