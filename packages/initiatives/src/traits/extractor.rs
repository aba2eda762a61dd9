//! Text-extraction seam.
//!
//! Format-specific extraction (PDF, DOCX, PPTX parsing) lives behind this
//! trait; the pipeline only sees ordered text segments with positional
//! metadata. Implementations resolve the document's bytes themselves.

use async_trait::async_trait;

use crate::error::IngestResult;
use crate::types::Document;

/// An ordered piece of extracted text with whatever positional metadata
/// the source format carries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextSegment {
    pub text: String,
    pub page: Option<u32>,
    pub section: Option<String>,
    pub speaker: Option<String>,
}

impl TextSegment {
    /// A plain segment with no positional metadata.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Set the page number.
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Set the section heading.
    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    /// Set the speaker.
    pub fn with_speaker(mut self, speaker: impl Into<String>) -> Self {
        self.speaker = Some(speaker.into());
        self
    }
}

/// Extracts ordered text segments from a document's source file.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract the document's text in reading order.
    ///
    /// An empty result (or segments that are all whitespace) means the
    /// document has no usable content; the pipeline fails it without
    /// entering `Processing`.
    async fn extract(&self, document: &Document) -> IngestResult<Vec<TextSegment>>;
}
