//! Question answering over retrieved chunks.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::with_retries;
use crate::error::Result;
use crate::traits::ReasoningBackend;
use crate::types::{AnalysisConfig, ChunkHit};

/// A quote tied back to the chunk it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub quote: String,
    pub document_id: Uuid,
    pub chunk_id: Uuid,
}

/// An answer to an ad-hoc question, grounded in retrieved chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub confidence: f32,
    pub related_topics: Vec<String>,
}

/// Answers questions from retrieved context and grounds the citations.
pub struct QuestionAnswerer<B: ?Sized> {
    backend: Arc<B>,
    config: AnalysisConfig,
}

impl<B: ReasoningBackend + ?Sized> QuestionAnswerer<B> {
    pub fn new(backend: Arc<B>, config: AnalysisConfig) -> Self {
        Self { backend, config }
    }

    /// Answer a question using the given hits as context.
    ///
    /// Citations the model produces are kept only when the quoted text
    /// actually appears in a retrieved chunk; ungrounded quotes are
    /// dropped.
    pub async fn answer(
        &self,
        question: &str,
        company_name: &str,
        hits: &[ChunkHit],
    ) -> Result<Answer> {
        let contexts: Vec<String> = hits.iter().map(|h| h.text.clone()).collect();

        let raw = with_retries(&self.config, "answer", || {
            let backend = Arc::clone(&self.backend);
            let question = question.to_string();
            let company = company_name.to_string();
            let contexts = contexts.clone();
            async move { backend.answer(&question, &company, &contexts).await }
        })
        .await?;

        let citations = raw
            .citations
            .into_iter()
            .filter_map(|quote| {
                let quote = quote.trim().to_string();
                hits.iter()
                    .find(|h| h.text.contains(&quote))
                    .map(|h| Citation {
                        quote,
                        document_id: h.document_id,
                        chunk_id: h.chunk_id,
                    })
            })
            .collect();

        Ok(Answer {
            answer: raw.answer,
            citations,
            confidence: raw.confidence.clamp(0.0, 1.0),
            related_topics: raw.related_topics,
        })
    }
}
