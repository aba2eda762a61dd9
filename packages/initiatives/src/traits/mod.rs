//! Trait seams between the pipeline and its collaborators.

pub mod backend;
pub mod extractor;
pub mod index;
pub mod store;

pub use backend::{ExtractionRequest, RawAnswer, RawInitiative, RawInsight, ReasoningBackend};
pub use extractor::{TextExtractor, TextSegment};
pub use index::{
    cosine_similarity, reciprocal_rank_fusion, HybridIndex, IndexEntry, KeywordSearch,
    VectorIndex, RRF_K,
};
pub use store::{DocumentStore, InitiativeStore, JobStore, Store};
