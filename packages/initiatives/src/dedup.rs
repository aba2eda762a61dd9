//! Cross-document initiative deduplication.
//!
//! Candidates merge into a company's canonical initiatives by embedding
//! similarity, gated on category. Dedup runs serially per company: one
//! writer owns the working set for the whole pass, so two near-identical
//! candidates in the same batch converge on the same canonical record
//! instead of racing to create two.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use indexmap::IndexMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::Result;
use crate::programs::with_retries;
use crate::traits::{cosine_similarity, InitiativeStore, ReasoningBackend};
use crate::types::{
    AnalysisConfig, CandidateInitiative, CanonicalInitiative, DedupConfig, Evidence,
    InitiativeStatus,
};

/// Two similarity scores closer than this are a tie.
const SCORE_EPSILON: f32 = 1e-3;

/// Result of deduplicating one document's candidates.
#[derive(Debug, Clone, Copy, Default)]
pub struct DedupOutcome {
    /// Candidates merged into existing canonical initiatives
    pub merged: usize,

    /// Candidates that became new canonical initiatives
    pub created: usize,
}

/// Serial per-company deduplicator.
pub struct Deduplicator<B: ?Sized> {
    backend: Arc<B>,
    config: DedupConfig,
    analysis: AnalysisConfig,
}

impl<B: ReasoningBackend + ?Sized> Deduplicator<B> {
    pub fn new(backend: Arc<B>, config: DedupConfig, analysis: AnalysisConfig) -> Self {
        Self {
            backend,
            config,
            analysis,
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embedding = with_retries(&self.analysis, "embed", || {
            let backend = Arc::clone(&self.backend);
            let text = text.to_string();
            async move { backend.embed(&text).await }
        })
        .await?;
        Ok(embedding)
    }

    /// Merge one document's candidates into the company's canonical set.
    ///
    /// `mentioned_at` is the source document's anchor date; it stamps every
    /// evidence record produced from this batch. Each merge or create is
    /// committed to the store before the next candidate is considered, so
    /// a crash mid-batch loses at most the uncommitted tail.
    pub async fn dedup_document<S>(
        &self,
        store: &S,
        company_id: Uuid,
        mentioned_at: NaiveDate,
        candidates: Vec<CandidateInitiative>,
    ) -> Result<DedupOutcome>
    where
        S: InitiativeStore + ?Sized,
    {
        if candidates.is_empty() {
            return Ok(DedupOutcome::default());
        }

        let mut working: IndexMap<Uuid, CanonicalInitiative> = store
            .initiatives_for_company(company_id)
            .await?
            .into_iter()
            .map(|i| (i.id, i))
            .collect();

        // Embeddings of canonical similarity texts, computed on demand and
        // invalidated when a merge changes the text.
        let mut embeddings: HashMap<Uuid, Vec<f32>> = HashMap::new();
        let mut outcome = DedupOutcome::default();

        for candidate in candidates {
            let candidate_embedding = self.embed(&candidate.similarity_text()).await?;

            let mut best: Option<(Uuid, f32)> = None;
            for (id, canonical) in &working {
                if canonical.category != candidate.category {
                    continue;
                }
                if !embeddings.contains_key(id) {
                    let e = self.embed(&canonical.similarity_text()).await?;
                    embeddings.insert(*id, e);
                }
                let score = cosine_similarity(&candidate_embedding, &embeddings[id]);
                if score < self.config.similarity_threshold {
                    continue;
                }
                best = match best {
                    None => Some((*id, score)),
                    Some((best_id, best_score)) => {
                        let tied = (score - best_score).abs() < SCORE_EPSILON;
                        let wins = score > best_score + SCORE_EPSILON
                            || (tied
                                && working[id].last_mentioned_at
                                    > working[&best_id].last_mentioned_at);
                        if wins {
                            Some((*id, score))
                        } else {
                            Some((best_id, best_score))
                        }
                    }
                };
            }

            match best {
                Some((id, score)) => {
                    debug!(initiative_id = %id, score, name = %candidate.name, "merging candidate");
                    let canonical = &mut working[&id];
                    merge_candidate(canonical, &candidate, mentioned_at);
                    embeddings.remove(&id);
                    store.put_initiative(canonical).await?;
                    outcome.merged += 1;
                }
                None => {
                    let canonical = new_canonical(&candidate, mentioned_at);
                    debug!(initiative_id = %canonical.id, name = %canonical.name, "new initiative");
                    embeddings.insert(canonical.id, candidate_embedding);
                    store.put_initiative(&canonical).await?;
                    working.insert(canonical.id, canonical);
                    outcome.created += 1;
                }
            }
        }

        info!(
            %company_id,
            merged = outcome.merged,
            created = outcome.created,
            "deduplication pass finished"
        );
        Ok(outcome)
    }
}

/// Fold a candidate into an existing canonical initiative.
///
/// Confidence never regresses, the longer description wins, metrics union,
/// and a present timeline replaces the stored one (the newer mention's
/// framing is the better guidance).
fn merge_candidate(
    canonical: &mut CanonicalInitiative,
    candidate: &CandidateInitiative,
    mentioned_at: NaiveDate,
) {
    for evidence in &candidate.evidence {
        canonical.push_evidence(Evidence {
            id: Uuid::new_v4(),
            initiative_id: canonical.id,
            document_id: candidate.document_id,
            chunk_id: candidate.chunk_id,
            quote: evidence.quote.clone(),
            page: evidence.page,
            speaker: evidence.speaker.clone(),
            relevance: candidate.confidence,
            mentioned_at,
            created_at: Utc::now(),
        });
    }
    canonical.confidence = canonical.confidence.max(candidate.confidence);
    if candidate.description.len() > canonical.description.len() {
        canonical.description = candidate.description.clone();
    }
    for metric in &candidate.metrics {
        if !canonical.metrics.contains(metric) {
            canonical.metrics.push(metric.clone());
        }
    }
    if let Some(timeline) = &candidate.timeline {
        canonical.timeline = Some(timeline.describe());
    }
    canonical.updated_at = Utc::now();
}

/// Promote a candidate to a new canonical initiative.
fn new_canonical(candidate: &CandidateInitiative, mentioned_at: NaiveDate) -> CanonicalInitiative {
    let now = Utc::now();
    let mut canonical = CanonicalInitiative {
        id: Uuid::new_v4(),
        company_id: candidate.company_id,
        name: candidate.name.clone(),
        description: candidate.description.clone(),
        category: candidate.category,
        status: InitiativeStatus::Active,
        timeline: candidate.timeline.as_ref().map(|t| t.describe()),
        first_mentioned_at: mentioned_at,
        last_mentioned_at: mentioned_at,
        mention_count: 0,
        document_count: 0,
        confidence: candidate.confidence,
        metrics: candidate.metrics.clone(),
        evidence: Vec::new(),
        created_at: now,
        updated_at: now,
    };
    for evidence in &candidate.evidence {
        canonical.push_evidence(Evidence {
            id: Uuid::new_v4(),
            initiative_id: canonical.id,
            document_id: candidate.document_id,
            chunk_id: candidate.chunk_id,
            quote: evidence.quote.clone(),
            page: evidence.page,
            speaker: evidence.speaker.clone(),
            relevance: candidate.confidence,
            mentioned_at,
            created_at: Utc::now(),
        });
    }
    canonical
}
