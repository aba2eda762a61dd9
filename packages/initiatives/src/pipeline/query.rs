//! Query flow: retrieval and grounded question answering.

use std::sync::Arc;

use tracing::info;

use super::Pipeline;
use crate::error::{PipelineError, Result};
use crate::index::query_chunks;
use crate::programs::{Answer, QuestionAnswerer};
use crate::traits::{HybridIndex, ReasoningBackend, Store, TextExtractor};
use crate::types::{ChunkHit, RetrievalFilter};

impl<S, I, B, X> Pipeline<S, I, B, X>
where
    S: Store + 'static,
    I: HybridIndex + 'static,
    B: ReasoningBackend + 'static,
    X: TextExtractor + 'static,
{
    /// Raw retrieval over indexed chunks, hybrid when configured.
    pub async fn search(&self, query: &str, filter: &RetrievalFilter) -> Result<Vec<ChunkHit>> {
        if query.trim().is_empty() {
            return Err(PipelineError::InvalidQuery {
                reason: "query is empty".to_string(),
            });
        }
        query_chunks(
            &*self.index,
            &*self.backend,
            query,
            filter,
            &self.config.retrieval,
        )
        .await
    }

    /// Answer an ad-hoc question over a company's indexed documents.
    ///
    /// Retrieval is scoped by the filter; the answer cites only quotes that
    /// appear verbatim in retrieved chunks. With nothing retrieved the
    /// question is not sent to the backend at all.
    pub async fn query(
        &self,
        question: &str,
        company_name: &str,
        filter: &RetrievalFilter,
    ) -> Result<Answer> {
        let hits = self.search(question, filter).await?;
        if hits.is_empty() {
            info!(question, "no indexed content matched the question");
            return Ok(Answer {
                answer: "No relevant information was found in the indexed documents.".to_string(),
                citations: Vec::new(),
                confidence: 0.0,
                related_topics: Vec::new(),
            });
        }

        let answerer =
            QuestionAnswerer::new(Arc::clone(&self.backend), self.config.analysis.clone());
        answerer.answer(question, company_name, &hits).await
    }
}
