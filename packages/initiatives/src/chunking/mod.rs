//! Document chunking.
//!
//! Two strategies over the extracted text: structural chunking follows the
//! document's own section and page boundaries, semantic chunking windows
//! sentences with overlap. The strategy is picked from the document type;
//! there is no pluggable chunker seam.

mod semantic;
mod structural;

pub use semantic::{sentence_spans, SentenceSpan};

use crate::types::{Chunk, ChunkConfig, Document, DocumentType};
use crate::traits::TextSegment;

/// The closed set of chunking strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStrategy {
    /// Follow section and page boundaries from the source format.
    Structural,
    /// Sentence windows with overlap, for prose and transcripts.
    Semantic,
}

impl ChunkStrategy {
    /// Strategy for a document type. Formats with reliable structure get
    /// structural chunking; prose-heavy formats get semantic.
    pub fn for_document_type(doc_type: DocumentType) -> Self {
        match doc_type {
            DocumentType::AnnualReport
            | DocumentType::QuarterlyReport
            | DocumentType::SecFiling
            | DocumentType::InvestorPresentation => Self::Structural,
            DocumentType::EarningsCall | DocumentType::PressRelease | DocumentType::Other => {
                Self::Semantic
            }
        }
    }
}

/// Chunk a document's extracted segments.
///
/// Whitespace-only segments are dropped first; a document whose segments
/// are all empty yields no chunks. Ordinals are assigned contiguously from
/// zero in reading order.
pub fn chunk_document(
    document: &Document,
    segments: &[TextSegment],
    config: &ChunkConfig,
) -> Vec<Chunk> {
    let segments: Vec<&TextSegment> = segments
        .iter()
        .filter(|s| !s.text.trim().is_empty())
        .collect();
    if segments.is_empty() {
        return Vec::new();
    }

    let chunks = match ChunkStrategy::for_document_type(document.doc_type) {
        ChunkStrategy::Structural => structural::chunk(document.id, &segments, config),
        ChunkStrategy::Semantic => semantic::chunk(document.id, &segments, config),
    };

    debug_assert!(chunks.iter().enumerate().all(|(i, c)| c.ordinal == i));
    chunks
}
