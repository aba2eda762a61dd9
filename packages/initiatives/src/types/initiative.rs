//! Initiative types: candidates, canonical initiatives, evidence, insights.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::temporal::MentionDate;

/// Closed set of initiative categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitiativeCategory {
    Strategy,
    Product,
    Market,
    Operational,
    Financial,
    Technology,
    Regulatory,
    Competitive,
}

impl InitiativeCategory {
    /// Normalize a model-produced category string to the closed set.
    ///
    /// Common variations map to their canonical category; anything
    /// unrecognized falls back to `Strategy`.
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "strategy" | "strategic" | "growth" => Self::Strategy,
            "product" | "products" => Self::Product,
            "market" | "marketing" | "expansion" => Self::Market,
            "operational" | "operations" | "cost" => Self::Operational,
            "financial" | "finance" | "revenue" => Self::Financial,
            "technology" | "tech" | "digital" => Self::Technology,
            "regulatory" | "compliance" => Self::Regulatory,
            "competitive" | "competition" => Self::Competitive,
            _ => Self::Strategy,
        }
    }
}

/// Lifecycle of a canonical initiative. Initiatives are never deleted,
/// only status-transitioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitiativeStatus {
    Active,
    Completed,
    Abandoned,
    OnHold,
}

/// Whether a mention is guidance/plan or reported fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outlook {
    ForwardLooking,
    BackwardLooking,
}

/// A quoted span supporting a candidate, pre-merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateEvidence {
    pub quote: String,
    pub page: Option<u32>,
    pub speaker: Option<String>,
}

/// Raw extraction output from a single chunk of a single document.
///
/// Ephemeral: never persisted directly, consumed by the deduplicator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateInitiative {
    pub name: String,
    pub description: String,
    pub category: InitiativeCategory,

    /// Calibrated confidence in [0, 1]. Starts as the extractor's raw
    /// confidence; the confidence scorer replaces it.
    pub confidence: f32,

    pub evidence: Vec<CandidateEvidence>,

    /// Raw temporal expression as extracted, e.g. "next fiscal year"
    pub timeline_expr: Option<String>,

    /// Mentioned metrics or KPIs
    pub metrics: Vec<String>,

    pub outlook: Option<Outlook>,

    /// Normalized target timeline, set by the temporal normalizer
    pub timeline: Option<MentionDate>,

    pub company_id: Uuid,
    pub document_id: Uuid,
    pub chunk_id: Uuid,
}

impl CandidateInitiative {
    /// Text used for similarity embedding during deduplication.
    pub fn similarity_text(&self) -> String {
        format!("{}: {}", self.name, self.description)
    }
}

/// A quoted excerpt supporting a canonical initiative.
///
/// Owned by exactly one canonical initiative; reassigned on re-clustering,
/// never duplicated. Identity is (document, chunk, quote).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    pub id: Uuid,
    pub initiative_id: Uuid,
    pub document_id: Uuid,
    pub chunk_id: Uuid,
    pub quote: String,
    pub page: Option<u32>,
    pub speaker: Option<String>,
    pub relevance: f32,
    pub mentioned_at: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Evidence {
    /// Stable identity key for deduplication: sha256 over
    /// (document_id, chunk_id, quote).
    pub fn identity_key(document_id: Uuid, chunk_id: Uuid, quote: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(document_id.as_bytes());
        hasher.update(chunk_id.as_bytes());
        hasher.update(quote.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// This evidence's identity key.
    pub fn key(&self) -> String {
        Self::identity_key(self.document_id, self.chunk_id, &self.quote)
    }
}

/// The deduplicated, cross-document representation of one real-world
/// strategic initiative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalInitiative {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub description: String,
    pub category: InitiativeCategory,
    pub status: InitiativeStatus,

    /// Normalized timeline description, e.g. "Q1 2025 – Q4 2026"
    pub timeline: Option<String>,

    pub first_mentioned_at: NaiveDate,
    pub last_mentioned_at: NaiveDate,

    /// Always equals the number of distinct evidence records.
    pub mention_count: usize,

    /// Number of distinct source documents.
    pub document_count: usize,

    /// Maximum observed confidence; never regresses on merge.
    pub confidence: f32,

    pub metrics: Vec<String>,
    pub evidence: Vec<Evidence>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CanonicalInitiative {
    /// Append evidence unless an identical (document, chunk, quote) record
    /// already exists. Keeps `mention_count` and `document_count` in sync.
    /// Returns true if the evidence was new.
    pub fn push_evidence(&mut self, evidence: Evidence) -> bool {
        let key = evidence.key();
        if self.evidence.iter().any(|e| e.key() == key) {
            return false;
        }
        self.first_mentioned_at = self.first_mentioned_at.min(evidence.mentioned_at);
        self.last_mentioned_at = self.last_mentioned_at.max(evidence.mentioned_at);
        self.evidence.push(evidence);
        self.mention_count = self.evidence.len();
        self.document_count = {
            let mut docs: Vec<Uuid> = self.evidence.iter().map(|e| e.document_id).collect();
            docs.sort();
            docs.dedup();
            docs.len()
        };
        self.updated_at = Utc::now();
        true
    }

    /// Text used for similarity embedding during deduplication.
    pub fn similarity_text(&self) -> String {
        format!("{}: {}", self.name, self.description)
    }
}

/// A lighter-weight, document-scoped extraction. Independent lifecycle
/// from initiatives: created per document during analysis, never merged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub id: Uuid,
    pub company_id: Uuid,
    pub document_id: Uuid,
    pub category: InitiativeCategory,
    pub content: String,
    pub importance: f32,
    pub confidence: f32,
    /// Sentiment in [-1, 1]
    pub sentiment: f32,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_normalization() {
        assert_eq!(InitiativeCategory::normalize("Strategic"), InitiativeCategory::Strategy);
        assert_eq!(InitiativeCategory::normalize("expansion"), InitiativeCategory::Market);
        assert_eq!(InitiativeCategory::normalize("cost"), InitiativeCategory::Operational);
        assert_eq!(InitiativeCategory::normalize("digital"), InitiativeCategory::Technology);
        assert_eq!(InitiativeCategory::normalize("something else"), InitiativeCategory::Strategy);
    }

    #[test]
    fn test_evidence_identity_key_is_stable() {
        let doc = Uuid::new_v4();
        let chunk = Uuid::new_v4();
        let a = Evidence::identity_key(doc, chunk, "we will expand");
        let b = Evidence::identity_key(doc, chunk, "we will expand");
        let c = Evidence::identity_key(doc, chunk, "different quote");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_push_evidence_dedups_and_counts() {
        let company = Uuid::new_v4();
        let doc = Uuid::new_v4();
        let chunk = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let init_id = Uuid::new_v4();

        let mut init = CanonicalInitiative {
            id: init_id,
            company_id: company,
            name: "Southeast Asia expansion".into(),
            description: "Expand into Southeast Asia".into(),
            category: InitiativeCategory::Market,
            status: InitiativeStatus::Active,
            timeline: None,
            first_mentioned_at: date,
            last_mentioned_at: date,
            mention_count: 0,
            document_count: 0,
            confidence: 0.8,
            metrics: vec![],
            evidence: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let ev = Evidence {
            id: Uuid::new_v4(),
            initiative_id: init_id,
            document_id: doc,
            chunk_id: chunk,
            quote: "we are expanding into Southeast Asia".into(),
            page: None,
            speaker: None,
            relevance: 0.9,
            mentioned_at: date,
            created_at: Utc::now(),
        };

        assert!(init.push_evidence(ev.clone()));
        assert_eq!(init.mention_count, 1);
        assert_eq!(init.document_count, 1);

        // Same identity, different record id: rejected
        let mut dup = ev;
        dup.id = Uuid::new_v4();
        assert!(!init.push_evidence(dup));
        assert_eq!(init.mention_count, 1);
    }

    #[test]
    fn test_push_evidence_extends_date_bounds() {
        let company = Uuid::new_v4();
        let init_id = Uuid::new_v4();
        let q2 = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let q3 = NaiveDate::from_ymd_opt(2024, 9, 30).unwrap();

        let mut init = CanonicalInitiative {
            id: init_id,
            company_id: company,
            name: "n".into(),
            description: "d".into(),
            category: InitiativeCategory::Strategy,
            status: InitiativeStatus::Active,
            timeline: None,
            first_mentioned_at: q2,
            last_mentioned_at: q2,
            mention_count: 0,
            document_count: 0,
            confidence: 0.5,
            metrics: vec![],
            evidence: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let later = Evidence {
            id: Uuid::new_v4(),
            initiative_id: init_id,
            document_id: Uuid::new_v4(),
            chunk_id: Uuid::new_v4(),
            quote: "again".into(),
            page: None,
            speaker: None,
            relevance: 0.5,
            mentioned_at: q3,
            created_at: Utc::now(),
        };
        init.push_evidence(later);

        assert_eq!(init.first_mentioned_at, q2);
        assert_eq!(init.last_mentioned_at, q3);
        assert!(init.first_mentioned_at <= init.last_mentioned_at);
    }
}
