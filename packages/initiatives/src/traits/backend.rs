//! Reasoning-backend seam.
//!
//! All model calls go through [`ReasoningBackend`]: structured extraction,
//! outlook classification, question answering and embeddings. Raw model
//! outputs use loose string fields; the extraction programs normalize them
//! into the closed domain types.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::BackendResult;
use crate::types::Outlook;

/// One chunk of document text plus the context the extraction prompt needs.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub company_name: String,
    pub document_title: String,
    pub chunk_text: String,
    pub section: Option<String>,
    pub speaker: Option<String>,
}

/// Model-produced initiative, before normalization.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RawInitiative {
    pub name: String,
    pub description: String,

    /// Free-form category label, normalized downstream
    pub category: String,

    /// Raw temporal expression, e.g. "over the next two years"
    pub timeline: Option<String>,

    /// Mentioned metrics or KPIs
    #[serde(default)]
    pub metrics: Vec<String>,

    /// Model's own confidence in [0, 1]
    pub confidence: f32,

    /// Verbatim quote supporting the initiative
    pub evidence_quote: String,
}

/// Model-produced document insight, before normalization.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RawInsight {
    pub category: String,
    pub content: String,
    pub importance: f32,
    pub confidence: f32,

    /// Sentiment in [-1, 1]
    pub sentiment: f32,
}

/// Model-produced answer to an ad-hoc question.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RawAnswer {
    pub answer: String,

    /// Verbatim quotes from the provided context that support the answer
    #[serde(default)]
    pub citations: Vec<String>,

    pub confidence: f32,

    #[serde(default)]
    pub related_topics: Vec<String>,
}

/// The model seam for extraction, classification, QA and embeddings.
#[async_trait]
pub trait ReasoningBackend: Send + Sync {
    /// Extract candidate initiatives from one chunk.
    async fn extract_initiatives(
        &self,
        request: &ExtractionRequest,
    ) -> BackendResult<Vec<RawInitiative>>;

    /// Classify a single mention as guidance or reported fact.
    async fn classify_outlook(&self, name: &str, quote: &str) -> BackendResult<Outlook>;

    /// Extract document-scoped insights from one chunk.
    ///
    /// Optional capability; the default produces nothing.
    async fn extract_insights(
        &self,
        _request: &ExtractionRequest,
    ) -> BackendResult<Vec<RawInsight>> {
        Ok(Vec::new())
    }

    /// Answer a question given retrieved context passages.
    async fn answer(
        &self,
        question: &str,
        company_name: &str,
        contexts: &[String],
    ) -> BackendResult<RawAnswer>;

    /// Embed a text for similarity comparison.
    async fn embed(&self, text: &str) -> BackendResult<Vec<f32>>;

    /// Embed a batch of texts. The default embeds serially.
    async fn embed_batch(&self, texts: &[String]) -> BackendResult<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}
