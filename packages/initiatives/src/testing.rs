//! Mock implementations for testing.
//!
//! Provides deterministic mock implementations of the backend and
//! extractor seams so pipeline behavior can be tested without network
//! access. Fixtures are keyed by substring match against the text the
//! call would send, with injectable failure budgets.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{BackendError, BackendResult, IngestError, IngestResult};
use crate::programs::heuristic_outlook;
use crate::traits::{
    ExtractionRequest, RawAnswer, RawInitiative, RawInsight, ReasoningBackend, TextExtractor,
    TextSegment,
};
use crate::types::{Document, Outlook};

/// Failure kinds injectable into the mock backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    RateLimited,
    Timeout,
    InvalidResponse,
}

impl MockFailure {
    fn to_error(self) -> BackendError {
        match self {
            Self::RateLimited => BackendError::RateLimited,
            Self::Timeout => BackendError::Timeout,
            Self::InvalidResponse => BackendError::InvalidResponse {
                reason: "injected malformed response".to_string(),
            },
        }
    }
}

/// Deterministic mock reasoning backend.
///
/// Extraction fixtures are matched by substring against the chunk text;
/// embeddings default to a bag-of-words hash so texts sharing vocabulary
/// come out similar and unrelated texts near-orthogonal.
#[derive(Default)]
pub struct MockBackend {
    extractions: Vec<(String, Vec<RawInitiative>)>,
    insights: Vec<(String, Vec<RawInsight>)>,
    outlooks: Vec<(String, Outlook)>,
    answer: Option<RawAnswer>,
    embedding_overrides: Vec<(String, Vec<f32>)>,
    embedding_failures: Vec<String>,
    embedding_failure_budgets: RwLock<Vec<(String, u32, MockFailure)>>,
    extraction_failures: RwLock<Vec<(String, u32, MockFailure)>>,
    dims: usize,
    calls: RwLock<Vec<String>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            dims: 64,
            ..Default::default()
        }
    }

    /// Return these initiatives when the chunk text contains `key`.
    pub fn with_extraction(
        mut self,
        key: impl Into<String>,
        initiatives: Vec<RawInitiative>,
    ) -> Self {
        self.extractions.push((key.into(), initiatives));
        self
    }

    /// Return these insights when the chunk text contains `key`.
    pub fn with_insights(mut self, key: impl Into<String>, insights: Vec<RawInsight>) -> Self {
        self.insights.push((key.into(), insights));
        self
    }

    /// Classify quotes containing `key` with a fixed outlook.
    pub fn with_outlook(mut self, key: impl Into<String>, outlook: Outlook) -> Self {
        self.outlooks.push((key.into(), outlook));
        self
    }

    /// Fixed answer for all questions.
    pub fn with_answer(mut self, answer: RawAnswer) -> Self {
        self.answer = Some(answer);
        self
    }

    /// Override the embedding for an exact text.
    pub fn with_embedding(mut self, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        self.embedding_overrides.push((text.into(), embedding));
        self
    }

    /// Fail embedding calls whose text contains `key`.
    pub fn with_embedding_failure(mut self, key: impl Into<String>) -> Self {
        self.embedding_failures.push(key.into());
        self
    }

    /// Fail the next `times` embedding calls whose text contains `key`,
    /// then recover.
    pub fn with_embedding_failures(
        self,
        key: impl Into<String>,
        times: u32,
        failure: MockFailure,
    ) -> Self {
        if let Ok(mut budgets) = self.embedding_failure_budgets.write() {
            budgets.push((key.into(), times, failure));
        }
        self
    }

    /// Fail the next `times` extraction calls whose chunk text contains
    /// `key`, then recover.
    pub fn with_extraction_failures(
        self,
        key: impl Into<String>,
        times: u32,
        failure: MockFailure,
    ) -> Self {
        if let Ok(mut failures) = self.extraction_failures.write() {
            failures.push((key.into(), times, failure));
        }
        self
    }

    /// Names of all calls received, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of calls with the given name.
    pub fn call_count(&self, name: &str) -> usize {
        self.calls().iter().filter(|c| *c == name).count()
    }

    fn record(&self, name: &str) {
        if let Ok(mut calls) = self.calls.write() {
            calls.push(name.to_string());
        }
    }

    fn take_failure(&self, text: &str) -> Option<BackendError> {
        take_budgeted(&self.extraction_failures, text)
    }

    /// Deterministic bag-of-words embedding.
    fn hash_embedding(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dims];
        for word in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let digest = Sha256::digest(word.as_bytes());
            let idx = u16::from_be_bytes([digest[0], digest[1]]) as usize % self.dims;
            v[idx] += 1.0;
        }
        v
    }
}

#[async_trait]
impl ReasoningBackend for MockBackend {
    async fn extract_initiatives(
        &self,
        request: &ExtractionRequest,
    ) -> BackendResult<Vec<RawInitiative>> {
        self.record("extract_initiatives");
        if let Some(err) = self.take_failure(&request.chunk_text) {
            return Err(err);
        }
        Ok(self
            .extractions
            .iter()
            .find(|(key, _)| request.chunk_text.contains(key))
            .map(|(_, initiatives)| initiatives.clone())
            .unwrap_or_default())
    }

    async fn classify_outlook(&self, _name: &str, quote: &str) -> BackendResult<Outlook> {
        self.record("classify_outlook");
        Ok(self
            .outlooks
            .iter()
            .find(|(key, _)| quote.contains(key))
            .map(|(_, outlook)| *outlook)
            .unwrap_or_else(|| heuristic_outlook(quote)))
    }

    async fn extract_insights(
        &self,
        request: &ExtractionRequest,
    ) -> BackendResult<Vec<RawInsight>> {
        self.record("extract_insights");
        Ok(self
            .insights
            .iter()
            .find(|(key, _)| request.chunk_text.contains(key))
            .map(|(_, insights)| insights.clone())
            .unwrap_or_default())
    }

    async fn answer(
        &self,
        _question: &str,
        _company_name: &str,
        contexts: &[String],
    ) -> BackendResult<RawAnswer> {
        self.record("answer");
        if let Some(answer) = &self.answer {
            return Ok(answer.clone());
        }
        Ok(RawAnswer {
            answer: "mock answer".to_string(),
            citations: contexts.first().cloned().into_iter().collect(),
            confidence: 0.5,
            related_topics: Vec::new(),
        })
    }

    async fn embed(&self, text: &str) -> BackendResult<Vec<f32>> {
        self.record("embed");
        if let Some(err) = take_budgeted(&self.embedding_failure_budgets, text) {
            return Err(err);
        }
        if self.embedding_failures.iter().any(|k| text.contains(k)) {
            return Err(BackendError::Embedding("injected failure".to_string()));
        }
        if let Some((_, embedding)) = self
            .embedding_overrides
            .iter()
            .find(|(key, _)| key == text)
        {
            return Ok(embedding.clone());
        }
        Ok(self.hash_embedding(text))
    }
}

fn take_budgeted(
    budgets: &RwLock<Vec<(String, u32, MockFailure)>>,
    text: &str,
) -> Option<BackendError> {
    let mut budgets = budgets.write().ok()?;
    for entry in budgets.iter_mut() {
        if entry.1 > 0 && text.contains(&entry.0) {
            entry.1 -= 1;
            return Some(entry.2.to_error());
        }
    }
    None
}

/// Mock text extractor with per-document fixtures.
#[derive(Default)]
pub struct MockExtractor {
    segments: HashMap<Uuid, Vec<TextSegment>>,
    failures: HashMap<Uuid, String>,
    calls: RwLock<Vec<Uuid>>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the segments returned for a document.
    pub fn with_segments(mut self, document_id: Uuid, segments: Vec<TextSegment>) -> Self {
        self.segments.insert(document_id, segments);
        self
    }

    /// Convenience: a single plain segment.
    pub fn with_text(self, document_id: Uuid, text: impl Into<String>) -> Self {
        self.with_segments(document_id, vec![TextSegment::plain(text)])
    }

    /// Fail extraction for a document as corrupt.
    pub fn with_failure(mut self, document_id: Uuid, reason: impl Into<String>) -> Self {
        self.failures.insert(document_id, reason.into());
        self
    }

    /// Document ids extracted, in call order.
    pub fn calls(&self) -> Vec<Uuid> {
        self.calls.read().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TextExtractor for MockExtractor {
    async fn extract(&self, document: &Document) -> IngestResult<Vec<TextSegment>> {
        if let Ok(mut calls) = self.calls.write() {
            calls.push(document.id);
        }
        if let Some(reason) = self.failures.get(&document.id) {
            return Err(IngestError::CorruptDocument {
                reason: reason.clone(),
            });
        }
        Ok(self.segments.get(&document.id).cloned().unwrap_or_default())
    }
}

/// A plausible raw initiative fixture.
pub fn raw_initiative(name: &str, category: &str, quote: &str) -> RawInitiative {
    RawInitiative {
        name: name.to_string(),
        description: format!("{name} as described in the disclosure"),
        category: category.to_string(),
        timeline: None,
        metrics: Vec::new(),
        confidence: 0.8,
        evidence_quote: quote.to_string(),
    }
}
