//! Domain data types for the initiative pipeline.

pub mod chunk;
pub mod config;
pub mod document;
pub mod initiative;
pub mod job;

pub use chunk::{Chunk, ChunkHit};
pub use config::{
    AnalysisConfig, ChunkConfig, DedupConfig, PipelineConfig, RetrievalConfig, RetrievalFilter,
};
pub use document::{Document, DocumentType, FiscalPeriod, ProcessingStatus, SourceFormat};
pub use initiative::{
    CandidateEvidence, CandidateInitiative, CanonicalInitiative, Evidence, InitiativeCategory,
    InitiativeStatus, Insight, Outlook,
};
pub use job::{AnalysisJob, DocumentOutcome, DocumentOutcomeStatus, RunStatus};
