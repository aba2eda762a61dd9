//! Chunk types: retrieval-unit segments of a document's text.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A retrieval-unit segment of a document, with enough positional metadata
/// to reconstruct a citation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: Uuid,
    pub document_id: Uuid,
    pub text: String,

    /// Position within the document's chunk sequence
    pub ordinal: usize,

    /// Section heading this chunk falls under, if detected
    pub section: Option<String>,

    /// Page number, for paginated formats
    pub page: Option<u32>,

    /// Speaker name, for transcript speaker turns
    pub speaker: Option<String>,

    /// Character span within the full extracted text, when the chunker
    /// operates on a contiguous text stream
    pub start_char: Option<usize>,
    pub end_char: Option<usize>,
}

impl Chunk {
    /// Create a new chunk.
    pub fn new(document_id: Uuid, ordinal: usize, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            text: text.into(),
            ordinal,
            section: None,
            page: None,
            speaker: None,
            start_char: None,
            end_char: None,
        }
    }

    /// Set the section heading.
    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    /// Set the page number.
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Set the speaker.
    pub fn with_speaker(mut self, speaker: impl Into<String>) -> Self {
        self.speaker = Some(speaker.into());
        self
    }

    /// Set the character span within the source text.
    pub fn with_span(mut self, start: usize, end: usize) -> Self {
        self.start_char = Some(start);
        self.end_char = Some(end);
        self
    }

    /// Human-readable citation location, e.g. "Outlook, page 12".
    pub fn location(&self) -> String {
        let mut parts = Vec::new();
        if let Some(section) = &self.section {
            parts.push(section.clone());
        }
        if let Some(page) = self.page {
            parts.push(format!("page {page}"));
        }
        if parts.is_empty() {
            format!("chunk {}", self.ordinal)
        } else {
            parts.join(", ")
        }
    }
}

/// A chunk hit returned by retrieval, scored and carrying enough metadata
/// for filtering and recency tie-breaks.
#[derive(Debug, Clone)]
pub struct ChunkHit {
    pub chunk_id: Uuid,
    pub document_id: Uuid,
    pub text: String,
    pub score: f32,
    pub published_at: Option<chrono::NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_formats() {
        let doc = Uuid::new_v4();
        let c = Chunk::new(doc, 0, "text").with_section("Outlook").with_page(12);
        assert_eq!(c.location(), "Outlook, page 12");

        let bare = Chunk::new(doc, 3, "text");
        assert_eq!(bare.location(), "chunk 3");
    }
}
