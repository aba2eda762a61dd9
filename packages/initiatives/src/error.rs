//! Typed errors for the initiative pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling. Document-level failures are
//! surfaced as status fields with human-readable reasons; these types are
//! for the programmatic seams.

use thiserror::Error;

/// Errors that can occur during pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Ingestion failed (terminal for the document)
    #[error("ingestion failed: {0}")]
    Ingest(#[from] IngestError),

    /// Reasoning backend call failed
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Storage operation failed
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Document not found in store
    #[error("document not found: {id}")]
    DocumentNotFound { id: uuid::Uuid },

    /// Analysis job not found in store
    #[error("job not found: {id}")]
    JobNotFound { id: uuid::Uuid },

    /// Operation is not valid for the entity's current state
    #[error("invalid state: {reason}")]
    InvalidState { reason: String },

    /// Invalid query provided
    #[error("invalid query: {reason}")]
    InvalidQuery { reason: String },
}

/// Errors from the document-to-text extraction seam.
///
/// All of these are terminal for the document: it is marked failed with a
/// human-readable reason and the user must re-upload.
#[derive(Debug, Error)]
pub enum IngestError {
    /// File format is not supported by any extractor
    #[error("unsupported format: {format}")]
    UnsupportedFormat { format: String },

    /// File bytes could not be parsed
    #[error("corrupt document: {reason}")]
    CorruptDocument { reason: String },

    /// Extraction produced no text
    #[error("empty content")]
    EmptyContent,

    /// Underlying I/O or storage failure while reading the source
    #[error("source read error: {0}")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl IngestError {
    /// Human-readable failure reason recorded on the document.
    pub fn user_reason(&self) -> String {
        match self {
            Self::UnsupportedFormat { format } => format!("unsupported format: {format}"),
            Self::CorruptDocument { reason } => format!("corrupt document: {reason}"),
            Self::EmptyContent => "empty content".to_string(),
            Self::Source(e) => format!("could not read source: {e}"),
        }
    }
}

/// Errors from the embedding/reasoning backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Rate limit exceeded (retryable with backoff)
    #[error("rate limited")]
    RateLimited,

    /// Call timed out (retryable)
    #[error("backend timeout")]
    Timeout,

    /// Response did not match the expected schema
    #[error("invalid response: {reason}")]
    InvalidResponse { reason: String },

    /// HTTP transport failure
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Embedding generation failed
    #[error("embedding error: {0}")]
    Embedding(String),
}

impl BackendError {
    /// Whether a retry with backoff may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Timeout)
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Result type alias for ingestion operations.
pub type IngestResult<T> = std::result::Result<T, IngestError>;

/// Result type alias for backend operations.
pub type BackendResult<T> = std::result::Result<T, BackendError>;
