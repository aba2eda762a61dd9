//! Semantic chunking: sentence windows with overlap.
//!
//! Each segment (a speaker turn in a transcript, a paragraph block in
//! plain prose) is split into sentences, then packed into windows of at
//! most `max_chunk_chars`. Consecutive windows share `overlap_sentences`
//! trailing sentences so a statement straddling a window boundary is
//! visible to extraction in at least one chunk whole.
//!
//! Character spans are tracked against the concatenation of the surviving
//! segments' texts: sentence spans partition each segment exactly, so the
//! union of chunk spans covers the full stream.

use uuid::Uuid;

use crate::traits::TextSegment;
use crate::types::{Chunk, ChunkConfig};

/// A sentence's half-open char span within its source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentenceSpan {
    pub start: usize,
    pub end: usize,
}

/// Split text into sentence spans that exactly partition `[0, char_len)`.
///
/// Boundaries fall after `.`, `!`, `?` or a newline when followed by
/// whitespace; trailing whitespace belongs to the preceding sentence so no
/// character is orphaned.
pub fn sentence_spans(text: &str) -> Vec<SentenceSpan> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }

    let mut spans = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let is_terminator = matches!(c, '.' | '!' | '?' | '\n');
        let next_is_break = chars
            .get(i + 1)
            .map(|n| n.is_whitespace())
            .unwrap_or(true);
        if is_terminator && next_is_break {
            // Consume trailing whitespace into this sentence.
            let mut end = i + 1;
            while end < chars.len() && chars[end].is_whitespace() {
                end += 1;
            }
            spans.push(SentenceSpan { start, end });
            start = end;
            i = end;
        } else {
            i += 1;
        }
    }
    if start < chars.len() {
        spans.push(SentenceSpan {
            start,
            end: chars.len(),
        });
    }
    spans
}

fn slice_chars(text: &str, span: SentenceSpan) -> String {
    text.chars()
        .skip(span.start)
        .take(span.end - span.start)
        .collect()
}

/// Window a segment's sentences into chunks.
///
/// `base` is the segment's char offset within the full stream; returned
/// spans are stream-relative.
fn window_segment(
    document_id: Uuid,
    segment: &TextSegment,
    base: usize,
    config: &ChunkConfig,
    out: &mut Vec<Chunk>,
) {
    let sentences = sentence_spans(&segment.text);
    if sentences.is_empty() {
        return;
    }

    let mut cursor = 0;
    while cursor < sentences.len() {
        let window_start = cursor;
        let mut window_end = cursor + 1;
        let mut chars = sentences[cursor].end - sentences[cursor].start;
        while window_end < sentences.len() {
            let next = sentences[window_end];
            let next_len = next.end - next.start;
            if chars + next_len > config.max_chunk_chars {
                break;
            }
            chars += next_len;
            window_end += 1;
        }

        let span = SentenceSpan {
            start: sentences[window_start].start,
            end: sentences[window_end - 1].end,
        };
        let mut chunk = Chunk::new(document_id, out.len(), slice_chars(&segment.text, span))
            .with_span(base + span.start, base + span.end);
        if let Some(section) = &segment.section {
            chunk = chunk.with_section(section.clone());
        }
        if let Some(page) = segment.page {
            chunk = chunk.with_page(page);
        }
        if let Some(speaker) = &segment.speaker {
            chunk = chunk.with_speaker(speaker.clone());
        }
        out.push(chunk);

        if window_end >= sentences.len() {
            break;
        }
        // Step back for overlap, but always advance past the window start.
        cursor = window_end
            .saturating_sub(config.overlap_sentences)
            .max(window_start + 1);
    }
}

/// Chunk segments with the semantic strategy.
pub fn chunk(document_id: Uuid, segments: &[&TextSegment], config: &ChunkConfig) -> Vec<Chunk> {
    let mut out = Vec::new();
    let mut base = 0;
    for segment in segments {
        window_segment(document_id, segment, base, config, &mut out);
        base += segment.text.chars().count();
    }
    out
}
