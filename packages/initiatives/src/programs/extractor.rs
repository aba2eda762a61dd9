//! Initiative extraction from a single chunk.

use std::sync::Arc;

use tracing::warn;

use super::with_retries;
use crate::traits::{ExtractionRequest, ReasoningBackend};
use crate::types::{
    AnalysisConfig, CandidateEvidence, CandidateInitiative, Chunk, Document, InitiativeCategory,
};

/// Result of extracting one chunk.
#[derive(Debug, Default)]
pub struct ChunkExtraction {
    pub candidates: Vec<CandidateInitiative>,

    /// True when the retry budget was exhausted and the chunk contributed
    /// nothing. Degraded chunks never fail the document.
    pub degraded: bool,
}

/// Runs initiative extraction against the backend and normalizes the raw
/// output into candidates.
pub struct InitiativeExtractor<B: ?Sized> {
    backend: Arc<B>,
    config: AnalysisConfig,
}

impl<B: ReasoningBackend + ?Sized> InitiativeExtractor<B> {
    pub fn new(backend: Arc<B>, config: AnalysisConfig) -> Self {
        Self { backend, config }
    }

    /// Extract candidates from one chunk.
    ///
    /// Backend failures degrade to an empty result after the retry budget;
    /// they never propagate.
    pub async fn extract(
        &self,
        document: &Document,
        chunk: &Chunk,
        company_name: &str,
    ) -> ChunkExtraction {
        let request = ExtractionRequest {
            company_name: company_name.to_string(),
            document_title: document.title.clone(),
            chunk_text: chunk.text.clone(),
            section: chunk.section.clone(),
            speaker: chunk.speaker.clone(),
        };

        let raw = match with_retries(&self.config, "extract_initiatives", || {
            let backend = Arc::clone(&self.backend);
            let request = request.clone();
            async move { backend.extract_initiatives(&request).await }
        })
        .await
        {
            Ok(raw) => raw,
            Err(err) => {
                warn!(
                    document_id = %document.id,
                    chunk_id = %chunk.id,
                    error = %err,
                    "extraction degraded to zero candidates"
                );
                return ChunkExtraction {
                    candidates: Vec::new(),
                    degraded: true,
                };
            }
        };

        let candidates = raw
            .into_iter()
            .filter_map(|init| {
                let name = init.name.trim().to_string();
                let quote = init.evidence_quote.trim().to_string();
                if name.is_empty() || quote.is_empty() {
                    return None;
                }
                let metrics: Vec<String> = init
                    .metrics
                    .into_iter()
                    .map(|m| m.trim().to_string())
                    .filter(|m| !m.is_empty())
                    .collect();
                Some(CandidateInitiative {
                    name,
                    description: init.description.trim().to_string(),
                    category: InitiativeCategory::normalize(&init.category),
                    confidence: init.confidence.clamp(0.0, 1.0),
                    evidence: vec![CandidateEvidence {
                        quote,
                        page: chunk.page,
                        speaker: chunk.speaker.clone(),
                    }],
                    timeline_expr: init.timeline.filter(|t| !t.trim().is_empty()),
                    metrics,
                    outlook: None,
                    timeline: None,
                    company_id: document.company_id,
                    document_id: document.id,
                    chunk_id: chunk.id,
                })
            })
            .collect();

        ChunkExtraction {
            candidates,
            degraded: false,
        }
    }
}
