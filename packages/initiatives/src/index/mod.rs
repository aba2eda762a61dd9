//! Index orchestration: embedding chunks into the index and querying it.
//!
//! The traits in [`crate::traits::index`] define storage and recall; this
//! module owns the policy around them: per-chunk embedding with partial
//! failure, atomic per-document replacement, and hybrid fusion on the
//! query path.

use tracing::warn;
use uuid::Uuid;

use crate::error::Result;
use crate::programs::with_retries;
use crate::traits::{
    reciprocal_rank_fusion, HybridIndex, IndexEntry, ReasoningBackend, VectorIndex,
};
use crate::types::{AnalysisConfig, Chunk, ChunkHit, Document, RetrievalConfig, RetrievalFilter};

/// Result of indexing a document's chunks.
#[derive(Debug, Clone, Default)]
pub struct IndexOutcome {
    /// Chunks successfully embedded and indexed
    pub indexed: usize,

    /// Chunks whose embedding failed and were left out of the index
    pub failed: Vec<Uuid>,
}

impl IndexOutcome {
    /// Whether every chunk made it into the index.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Embed a document's chunks and replace its entries in the index.
///
/// Each embedding runs under the retry budget, so transient rate limits
/// and timeouts don't cost a chunk. Failures past the budget are
/// per-chunk: surviving chunks are still indexed and the failures
/// reported in the outcome. The replacement itself is atomic per
/// document, so a concurrent query sees either the old set or the new
/// one.
pub async fn index_chunks<I, B>(
    index: &I,
    backend: &B,
    document: &Document,
    chunks: &[Chunk],
    retry: &AnalysisConfig,
) -> Result<IndexOutcome>
where
    I: VectorIndex + ?Sized,
    B: ReasoningBackend + ?Sized,
{
    let mut entries = Vec::with_capacity(chunks.len());
    let mut failed = Vec::new();

    for chunk in chunks {
        match with_retries(retry, "embed", || backend.embed(&chunk.text)).await {
            Ok(embedding) => entries.push(IndexEntry {
                chunk_id: chunk.id,
                document_id: document.id,
                company_id: document.company_id,
                anchor_date: Some(document.anchor_date()),
                text: chunk.text.clone(),
                embedding,
            }),
            Err(err) => {
                warn!(
                    document_id = %document.id,
                    chunk_id = %chunk.id,
                    error = %err,
                    "embedding failed, chunk left unindexed"
                );
                failed.push(chunk.id);
            }
        }
    }

    let indexed = entries.len();
    index.replace_document(document.id, entries).await?;
    Ok(IndexOutcome { indexed, failed })
}

/// Query the index, fusing semantic and keyword recall when hybrid
/// retrieval is enabled.
///
/// Results are scoped strictly by the filter and ordered by fused score,
/// ties broken by the owning document's recency.
pub async fn query_chunks<I, B>(
    index: &I,
    backend: &B,
    query: &str,
    filter: &RetrievalFilter,
    config: &RetrievalConfig,
) -> Result<Vec<ChunkHit>>
where
    I: HybridIndex + ?Sized,
    B: ReasoningBackend + ?Sized,
{
    let embedding = backend.embed(query).await?;

    if !config.hybrid {
        return index
            .semantic_search(&embedding, filter, config.top_k)
            .await;
    }

    // Over-fetch each list so fusion has candidates beyond the cut line.
    let pool = config.top_k * 2;
    let semantic = index.semantic_search(&embedding, filter, pool).await?;
    let keyword = index.keyword_search(query, filter, pool).await?;

    let mut fused = reciprocal_rank_fusion(semantic, keyword, config.semantic_weight);
    fused.truncate(config.top_k);
    Ok(fused)
}
