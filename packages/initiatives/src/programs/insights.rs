//! Document-scoped insight extraction.

use std::sync::Arc;

use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use super::with_retries;
use crate::traits::{ExtractionRequest, ReasoningBackend};
use crate::types::{AnalysisConfig, Chunk, Document, InitiativeCategory, Insight};

/// Extracts lightweight insights per chunk, independent of the initiative
/// lifecycle.
pub struct InsightExtractor<B: ?Sized> {
    backend: Arc<B>,
    config: AnalysisConfig,
}

impl<B: ReasoningBackend + ?Sized> InsightExtractor<B> {
    pub fn new(backend: Arc<B>, config: AnalysisConfig) -> Self {
        Self { backend, config }
    }

    /// Extract insights from one chunk. Failures degrade to nothing.
    pub async fn extract(
        &self,
        document: &Document,
        chunk: &Chunk,
        company_name: &str,
    ) -> Vec<Insight> {
        let request = ExtractionRequest {
            company_name: company_name.to_string(),
            document_title: document.title.clone(),
            chunk_text: chunk.text.clone(),
            section: chunk.section.clone(),
            speaker: chunk.speaker.clone(),
        };

        let raw = match with_retries(&self.config, "extract_insights", || {
            let backend = Arc::clone(&self.backend);
            let request = request.clone();
            async move { backend.extract_insights(&request).await }
        })
        .await
        {
            Ok(raw) => raw,
            Err(err) => {
                warn!(
                    document_id = %document.id,
                    chunk_id = %chunk.id,
                    error = %err,
                    "insight extraction skipped"
                );
                return Vec::new();
            }
        };

        raw.into_iter()
            .filter(|i| !i.content.trim().is_empty())
            .map(|i| Insight {
                id: Uuid::new_v4(),
                company_id: document.company_id,
                document_id: document.id,
                category: InitiativeCategory::normalize(&i.category),
                content: i.content.trim().to_string(),
                importance: i.importance.clamp(0.0, 1.0),
                confidence: i.confidence.clamp(0.0, 1.0),
                sentiment: i.sentiment.clamp(-1.0, 1.0),
                created_at: Utc::now(),
            })
            .collect()
    }
}
