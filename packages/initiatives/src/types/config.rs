//! Configuration types for the pipeline stages.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub chunking: ChunkConfig,
    pub retrieval: RetrievalConfig,
    pub dedup: DedupConfig,
    pub analysis: AnalysisConfig,
}

/// Chunker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Target chunk budget in characters.
    pub max_chunk_chars: usize,

    /// Sentences of trailing context carried into the next chunk by the
    /// semantic strategy.
    pub overlap_sentences: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: 2000,
            overlap_sentences: 1,
        }
    }
}

impl ChunkConfig {
    /// Set the chunk budget.
    pub fn with_max_chunk_chars(mut self, max: usize) -> Self {
        self.max_chunk_chars = max;
        self
    }

    /// Set the sentence overlap.
    pub fn with_overlap_sentences(mut self, overlap: usize) -> Self {
        self.overlap_sentences = overlap;
        self
    }
}

/// Retrieval configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Default number of results per query.
    pub top_k: usize,

    /// Enable hybrid recall (semantic + keyword).
    pub hybrid: bool,

    /// Weight for semantic search in hybrid fusion (0.0 to 1.0).
    /// The remaining weight goes to keyword search.
    pub semantic_weight: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 10,
            hybrid: true,
            semantic_weight: 0.6,
        }
    }
}

/// Deduplicator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Cosine-similarity threshold above which a candidate merges into an
    /// existing canonical initiative. Below it, a new one is created.
    pub similarity_threshold: f32,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.7,
        }
    }
}

/// Analysis-run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Maximum concurrent reasoning calls per run.
    pub concurrency: usize,

    /// Maximum attempts per reasoning call before degrading to zero
    /// candidates.
    pub max_attempts: u32,

    /// Base backoff between retries, doubled per attempt.
    pub retry_backoff_ms: u64,

    /// Also extract document-scoped insights during analysis.
    pub extract_insights: bool,

    /// Label candidates as forward- or backward-looking.
    pub classify_outlook: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            max_attempts: 3,
            retry_backoff_ms: 200,
            extract_insights: true,
            classify_outlook: true,
        }
    }
}

impl AnalysisConfig {
    /// Set the parallelism cap.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the retry budget.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the base retry backoff.
    pub fn with_retry_backoff_ms(mut self, ms: u64) -> Self {
        self.retry_backoff_ms = ms;
        self
    }
}

/// Filter for scoping retrieval to a company, document set or date range.
///
/// The date range applies to the owning document's anchor date (fiscal
/// period end or publication date), not to chunk content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalFilter {
    pub company_id: Option<Uuid>,

    /// Only chunks from these documents (None = all documents in scope).
    pub document_ids: Option<Vec<Uuid>>,

    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
}

impl RetrievalFilter {
    /// Match everything.
    pub fn all() -> Self {
        Self::default()
    }

    /// Scope to a single company.
    pub fn for_company(company_id: Uuid) -> Self {
        Self {
            company_id: Some(company_id),
            ..Default::default()
        }
    }

    /// Restrict to a document set.
    pub fn with_documents(mut self, ids: impl IntoIterator<Item = Uuid>) -> Self {
        self.document_ids = Some(ids.into_iter().collect());
        self
    }

    /// Restrict to documents anchored on or after this date.
    pub fn with_min_date(mut self, date: NaiveDate) -> Self {
        self.min_date = Some(date);
        self
    }

    /// Restrict to documents anchored on or before this date.
    pub fn with_max_date(mut self, date: NaiveDate) -> Self {
        self.max_date = Some(date);
        self
    }

    /// Whether an indexed entry matches this filter.
    pub fn matches(
        &self,
        company_id: Uuid,
        document_id: Uuid,
        anchor_date: Option<NaiveDate>,
    ) -> bool {
        if let Some(want) = self.company_id {
            if company_id != want {
                return false;
            }
        }
        if let Some(docs) = &self.document_ids {
            if !docs.contains(&document_id) {
                return false;
            }
        }
        if self.min_date.is_some() || self.max_date.is_some() {
            // Date-filtered queries exclude entries with no anchor date.
            let Some(date) = anchor_date else { return false };
            if let Some(min) = self.min_date {
                if date < min {
                    return false;
                }
            }
            if let Some(max) = self.max_date {
                if date > max {
                    return false;
                }
            }
        }
        true
    }
}
