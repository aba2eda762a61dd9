//! Retrieval-index seams and score-fusion helpers.
//!
//! Semantic and keyword recall are separate traits so either can be
//! swapped independently; hybrid fusion is a free function over their
//! ranked outputs.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::Result;
use crate::types::{ChunkHit, RetrievalFilter};

/// Reciprocal-rank-fusion constant. Dampens the influence of top ranks so
/// agreement between lists matters more than either list's ordering.
pub const RRF_K: f32 = 60.0;

/// One indexed chunk: the searchable text, its embedding, and the metadata
/// retrieval filters scope on.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub chunk_id: Uuid,
    pub document_id: Uuid,
    pub company_id: Uuid,

    /// The owning document's anchor date, used for date filters and
    /// recency tie-breaks.
    pub anchor_date: Option<NaiveDate>,

    pub text: String,
    pub embedding: Vec<f32>,
}

impl IndexEntry {
    /// The hit this entry produces at a given score.
    pub fn hit(&self, score: f32) -> ChunkHit {
        ChunkHit {
            chunk_id: self.chunk_id,
            document_id: self.document_id,
            text: self.text.clone(),
            score,
            published_at: self.anchor_date,
        }
    }
}

/// Embedding-based recall over indexed chunks.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Replace all of a document's entries with a new set. Atomic per
    /// document: readers never see a partial set.
    async fn replace_document(&self, document_id: Uuid, entries: Vec<IndexEntry>) -> Result<()>;

    /// Drop all of a document's entries.
    async fn remove_document(&self, document_id: Uuid) -> Result<()>;

    /// Nearest entries by cosine similarity, scoped by the filter.
    async fn semantic_search(
        &self,
        embedding: &[f32],
        filter: &RetrievalFilter,
        top_k: usize,
    ) -> Result<Vec<ChunkHit>>;
}

/// Term-based recall over indexed chunks.
#[async_trait]
pub trait KeywordSearch: Send + Sync {
    /// Best term matches for the query, scoped by the filter.
    async fn keyword_search(
        &self,
        query: &str,
        filter: &RetrievalFilter,
        top_k: usize,
    ) -> Result<Vec<ChunkHit>>;
}

/// An index supporting both recall modes.
pub trait HybridIndex: VectorIndex + KeywordSearch {}

impl<T: VectorIndex + KeywordSearch> HybridIndex for T {}

/// Cosine similarity between two vectors. Returns 0.0 on dimension
/// mismatch or zero-magnitude input.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a * mag_b)
}

/// Weighted reciprocal rank fusion of semantic and keyword result lists.
///
/// Each hit scores `w / (K + rank)` per list it appears in, with
/// `semantic_weight` on the semantic list and the remainder on the keyword
/// list. Hits present in both lists accumulate both contributions.
pub fn reciprocal_rank_fusion(
    semantic: Vec<ChunkHit>,
    keyword: Vec<ChunkHit>,
    semantic_weight: f32,
) -> Vec<ChunkHit> {
    let keyword_weight = 1.0 - semantic_weight;
    let mut fused: HashMap<Uuid, (ChunkHit, f32)> = HashMap::new();

    for (rank, hit) in semantic.into_iter().enumerate() {
        let score = semantic_weight / (RRF_K + rank as f32 + 1.0);
        fused
            .entry(hit.chunk_id)
            .and_modify(|(_, s)| *s += score)
            .or_insert((hit, score));
    }
    for (rank, hit) in keyword.into_iter().enumerate() {
        let score = keyword_weight / (RRF_K + rank as f32 + 1.0);
        fused
            .entry(hit.chunk_id)
            .and_modify(|(_, s)| *s += score)
            .or_insert((hit, score));
    }

    let mut hits: Vec<ChunkHit> = fused
        .into_values()
        .map(|(mut hit, score)| {
            hit.score = score;
            hit
        })
        .collect();
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.published_at.cmp(&a.published_at))
    });
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(chunk_id: Uuid, score: f32, date: Option<NaiveDate>) -> ChunkHit {
        ChunkHit {
            chunk_id,
            document_id: Uuid::new_v4(),
            text: String::new(),
            score,
            published_at: date,
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_rrf_rewards_agreement() {
        let shared = Uuid::new_v4();
        let sem_only = Uuid::new_v4();
        let kw_only = Uuid::new_v4();

        let semantic = vec![hit(sem_only, 0.9, None), hit(shared, 0.8, None)];
        let keyword = vec![hit(kw_only, 5.0, None), hit(shared, 3.0, None)];

        let fused = reciprocal_rank_fusion(semantic, keyword, 0.5);
        assert_eq!(fused[0].chunk_id, shared);
        assert_eq!(fused.len(), 3);
    }

    #[test]
    fn test_rrf_ties_break_by_recency() {
        let older = Uuid::new_v4();
        let newer = Uuid::new_v4();
        let d1 = NaiveDate::from_ymd_opt(2024, 3, 31);
        let d2 = NaiveDate::from_ymd_opt(2024, 6, 30);

        // Same ranks in mirrored lists with equal weights: tied scores.
        let semantic = vec![hit(older, 0.9, d1), hit(newer, 0.9, d2)];
        let keyword = vec![hit(newer, 0.9, d2), hit(older, 0.9, d1)];

        let fused = reciprocal_rank_fusion(semantic, keyword, 0.5);
        assert_eq!(fused[0].chunk_id, newer);
    }
}
