//! Structural chunking: follow section and page boundaries.
//!
//! Consecutive segments sharing a section and page form a group; groups
//! small enough become a single chunk, oversized ones split at paragraph
//! boundaries. A lone paragraph over budget falls back to sentence
//! packing so no chunk silently exceeds the budget by more than one
//! sentence.

use uuid::Uuid;

use super::semantic::sentence_spans;
use crate::traits::TextSegment;
use crate::types::{Chunk, ChunkConfig};

fn push_chunk(
    document_id: Uuid,
    text: String,
    section: Option<&String>,
    page: Option<u32>,
    out: &mut Vec<Chunk>,
) {
    let mut chunk = Chunk::new(document_id, out.len(), text);
    if let Some(section) = section {
        chunk = chunk.with_section(section.clone());
    }
    if let Some(page) = page {
        chunk = chunk.with_page(page);
    }
    out.push(chunk);
}

/// Split an oversized paragraph into sentence-packed pieces.
fn split_paragraph(paragraph: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = paragraph.chars().collect();
    let sentences = sentence_spans(paragraph);
    let mut pieces = Vec::new();
    let mut cursor = 0;
    while cursor < sentences.len() {
        let start = sentences[cursor].start;
        let mut end_idx = cursor + 1;
        let mut len = sentences[cursor].end - start;
        while end_idx < sentences.len() {
            let next = sentences[end_idx];
            if len + (next.end - next.start) > max_chars {
                break;
            }
            len += next.end - next.start;
            end_idx += 1;
        }
        let end = sentences[end_idx - 1].end;
        pieces.push(chars[start..end].iter().collect::<String>().trim().to_string());
        cursor = end_idx;
    }
    pieces
}

/// Chunk segments with the structural strategy.
pub fn chunk(document_id: Uuid, segments: &[&TextSegment], config: &ChunkConfig) -> Vec<Chunk> {
    let mut out = Vec::new();

    let mut i = 0;
    while i < segments.len() {
        let section = segments[i].section.as_ref();
        let page = segments[i].page;

        // Gather the consecutive run sharing this section and page.
        let mut paragraphs: Vec<String> = Vec::new();
        while i < segments.len()
            && segments[i].section.as_ref() == section
            && segments[i].page == page
        {
            paragraphs.extend(
                segments[i]
                    .text
                    .split("\n\n")
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(String::from),
            );
            i += 1;
        }

        // Pack paragraphs into chunks within the budget.
        let mut buffer = String::new();
        for paragraph in paragraphs {
            let para_len = paragraph.chars().count();
            if para_len > config.max_chunk_chars {
                if !buffer.is_empty() {
                    push_chunk(document_id, std::mem::take(&mut buffer), section, page, &mut out);
                }
                for piece in split_paragraph(&paragraph, config.max_chunk_chars) {
                    push_chunk(document_id, piece, section, page, &mut out);
                }
                continue;
            }
            let buffered = buffer.chars().count();
            if buffered > 0 && buffered + 2 + para_len > config.max_chunk_chars {
                push_chunk(document_id, std::mem::take(&mut buffer), section, page, &mut out);
            }
            if !buffer.is_empty() {
                buffer.push_str("\n\n");
            }
            buffer.push_str(&paragraph);
        }
        if !buffer.is_empty() {
            push_chunk(document_id, buffer, section, page, &mut out);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_groups_by_section() {
        let outlook = TextSegment::plain("We expect growth to continue.").with_section("Outlook");
        let risks = TextSegment::plain("Currency exposure remains a risk.").with_section("Risks");
        let chunks = chunk(
            Uuid::new_v4(),
            &[&outlook, &risks],
            &ChunkConfig::default(),
        );
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].section.as_deref(), Some("Outlook"));
        assert_eq!(chunks[1].section.as_deref(), Some("Risks"));
    }

    #[test]
    fn test_merges_small_paragraphs_in_one_section() {
        let seg =
            TextSegment::plain("First paragraph.\n\nSecond paragraph.").with_section("MD&A");
        let chunks = chunk(Uuid::new_v4(), &[&seg], &ChunkConfig::default());
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.contains("First paragraph."));
        assert!(chunks[0].text.contains("Second paragraph."));
    }

    #[test]
    fn test_oversized_section_splits_at_paragraphs() {
        let para = "Sentence one of the paragraph. Sentence two of it.";
        let text = vec![para; 10].join("\n\n");
        let seg = TextSegment::plain(text).with_section("Business");
        let config = ChunkConfig {
            max_chunk_chars: 120,
            overlap_sentences: 1,
        };
        let chunks = chunk(Uuid::new_v4(), &[&seg], &config);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert_eq!(c.section.as_deref(), Some("Business"));
            assert!(c.text.chars().count() <= 120);
        }
    }

    #[test]
    fn test_page_metadata_preserved() {
        let seg = TextSegment::plain("Slide content here.").with_page(7);
        let chunks = chunk(Uuid::new_v4(), &[&seg], &ChunkConfig::default());
        assert_eq!(chunks[0].page, Some(7));
    }

    #[test]
    fn test_ordinals_are_contiguous() {
        let a = TextSegment::plain("Alpha.").with_section("One");
        let b = TextSegment::plain("Beta.").with_section("Two");
        let c = TextSegment::plain("Gamma.").with_section("Three");
        let chunks = chunk(Uuid::new_v4(), &[&a, &b, &c], &ChunkConfig::default());
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.ordinal, i);
        }
    }

    proptest! {
        /// Paragraph packing and sentence splitting only ever shed
        /// whitespace: every non-whitespace character of the input
        /// survives into the chunk texts, in order.
        #[test]
        fn prop_chunks_keep_every_nonspace_character(
            text in "[a-zA-Z ,.\n]{1,500}",
            max in 30usize..160,
        ) {
            let segment = TextSegment::plain(text.clone()).with_section("Body");
            let config = ChunkConfig {
                max_chunk_chars: max,
                overlap_sentences: 1,
            };
            let chunks = chunk(Uuid::new_v4(), &[&segment], &config);

            let source: String = text.chars().filter(|c| !c.is_whitespace()).collect();
            let kept: String = chunks
                .iter()
                .flat_map(|c| c.text.chars())
                .filter(|c| !c.is_whitespace())
                .collect();
            prop_assert_eq!(kept, source);
        }
    }
}
