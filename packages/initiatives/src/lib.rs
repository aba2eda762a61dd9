//! Disclosure Analysis Pipeline
//!
//! Ingests corporate disclosure documents (earnings call transcripts,
//! annual reports, presentations), chunks and indexes them for hybrid
//! retrieval, extracts strategic initiatives with a reasoning backend, and
//! deduplicates mentions of the same initiative across documents and time
//! into canonical records with evidence trails.
//!
//! # Design Philosophy
//!
//! - Trait seams at every external dependency: storage, index, reasoning
//!   backend, text extraction
//! - Degraded beats dead: a failing chunk never fails its document, a
//!   failing document never fails its run
//! - Evidence-grounded: every initiative carries verbatim quotes tied to
//!   their source chunks
//! - Temporal references resolve against the document's own fiscal period,
//!   never the analysis time
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use initiatives::{MemoryIndex, MemoryStore, Pipeline};
//! use initiatives::pipeline::AnalysisRequest;
//! use initiatives::testing::{MockBackend, MockExtractor};
//!
//! let store = Arc::new(MemoryStore::new());
//! let index = Arc::new(MemoryIndex::new());
//! let backend = Arc::new(MockBackend::new());
//! let extractor = Arc::new(MockExtractor::new());
//! let pipeline = Arc::new(Pipeline::new(store, index, backend, extractor));
//!
//! pipeline.run_ingestion(document_id).await?;
//! let job = pipeline
//!     .run_analysis(AnalysisRequest::for_company(company_id, "Acme Corp"))
//!     .await?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Core trait abstractions (ReasoningBackend, Store, index)
//! - [`types`] - Domain data types
//! - [`chunking`] - Structural and semantic chunking strategies
//! - [`index`] - Indexing and hybrid retrieval orchestration
//! - [`programs`] - Extraction programs wrapped around backend calls
//! - [`dedup`] - Cross-document initiative deduplication
//! - [`temporal`] - Temporal expression normalization
//! - [`pipeline`] - Ingestion and analysis orchestration
//! - [`stores`] - Storage implementations (MemoryStore, MemoryIndex)
//! - [`backends`] - Backend implementations and wrappers
//! - [`security`] - Credential handling
//! - [`testing`] - Mock implementations for testing

pub mod backends;
pub mod chunking;
pub mod dedup;
pub mod error;
pub mod index;
pub mod pipeline;
pub mod programs;
pub mod security;
pub mod stores;
pub mod temporal;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{BackendError, IngestError, PipelineError};
pub use traits::{
    cosine_similarity, reciprocal_rank_fusion, DocumentStore, ExtractionRequest, HybridIndex,
    IndexEntry, InitiativeStore, JobStore, KeywordSearch, RawAnswer, RawInitiative, RawInsight,
    ReasoningBackend, Store, TextExtractor, TextSegment, VectorIndex,
};
pub use types::{
    AnalysisConfig, AnalysisJob, CandidateEvidence, CandidateInitiative, CanonicalInitiative,
    Chunk, ChunkConfig, ChunkHit, DedupConfig, Document, DocumentOutcome, DocumentOutcomeStatus,
    DocumentType, Evidence, FiscalPeriod, InitiativeCategory, InitiativeStatus, Insight, Outlook,
    PipelineConfig, ProcessingStatus, RetrievalConfig, RetrievalFilter, RunStatus, SourceFormat,
};

// Re-export pipeline components
pub use pipeline::{AnalysisRequest, Pipeline};

pub use chunking::{chunk_document, ChunkStrategy};
pub use dedup::{DedupOutcome, Deduplicator};
pub use index::{index_chunks, query_chunks, IndexOutcome};
pub use programs::{
    score_candidate, Answer, Citation, InitiativeExtractor, InsightExtractor, OutlookClassifier,
    QuestionAnswerer,
};
pub use temporal::{normalize, MentionDate, TemporalAnchor};

// Re-export stores
pub use stores::{MemoryIndex, MemoryStore};

// Re-export backends
pub use backends::{BackendExt, RateLimitedBackend};

#[cfg(feature = "openai")]
pub use backends::OpenAiBackend;

// Re-export testing utilities
pub use testing::{MockBackend, MockExtractor, MockFailure};
