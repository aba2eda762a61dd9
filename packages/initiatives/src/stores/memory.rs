//! In-memory storage and index, for tests and single-process deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{PipelineError, Result};
use crate::traits::{
    DocumentStore, IndexEntry, InitiativeStore, JobStore, KeywordSearch, VectorIndex,
};
use crate::traits::index::cosine_similarity;
use crate::types::{
    AnalysisJob, CanonicalInitiative, Chunk, ChunkHit, Document, Insight, RetrievalFilter,
};

/// In-memory store backed by `RwLock`ed maps.
#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<Uuid, Document>>,
    chunks: RwLock<HashMap<Uuid, Vec<Chunk>>>,
    initiatives: RwLock<HashMap<Uuid, CanonicalInitiative>>,
    insights: RwLock<HashMap<Uuid, Vec<Insight>>>,
    jobs: RwLock<HashMap<Uuid, AnalysisJob>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn put_document(&self, document: &Document) -> Result<()> {
        self.documents
            .write()
            .await
            .insert(document.id, document.clone());
        Ok(())
    }

    async fn get_document(&self, id: Uuid) -> Result<Option<Document>> {
        Ok(self.documents.read().await.get(&id).cloned())
    }

    async fn documents_for_company(&self, company_id: Uuid) -> Result<Vec<Document>> {
        let mut docs: Vec<Document> = self
            .documents
            .read()
            .await
            .values()
            .filter(|d| d.company_id == company_id)
            .cloned()
            .collect();
        docs.sort_by_key(|d| (d.published_at, d.created_at));
        Ok(docs)
    }

    async fn put_chunks(&self, chunks: &[Chunk]) -> Result<()> {
        let mut map = self.chunks.write().await;
        for chunk in chunks {
            map.entry(chunk.document_id)
                .or_default()
                .push(chunk.clone());
        }
        Ok(())
    }

    async fn chunks_for_document(&self, document_id: Uuid) -> Result<Vec<Chunk>> {
        let mut chunks = self
            .chunks
            .read()
            .await
            .get(&document_id)
            .cloned()
            .unwrap_or_default();
        chunks.sort_by_key(|c| c.ordinal);
        Ok(chunks)
    }

    async fn delete_chunks(&self, document_id: Uuid) -> Result<()> {
        self.chunks.write().await.remove(&document_id);
        Ok(())
    }
}

#[async_trait]
impl InitiativeStore for MemoryStore {
    async fn put_initiative(&self, initiative: &CanonicalInitiative) -> Result<()> {
        self.initiatives
            .write()
            .await
            .insert(initiative.id, initiative.clone());
        Ok(())
    }

    async fn initiatives_for_company(&self, company_id: Uuid) -> Result<Vec<CanonicalInitiative>> {
        let mut list: Vec<CanonicalInitiative> = self
            .initiatives
            .read()
            .await
            .values()
            .filter(|i| i.company_id == company_id)
            .cloned()
            .collect();
        list.sort_by_key(|i| i.created_at);
        Ok(list)
    }

    async fn put_insight(&self, insight: &Insight) -> Result<()> {
        self.insights
            .write()
            .await
            .entry(insight.document_id)
            .or_default()
            .push(insight.clone());
        Ok(())
    }

    async fn insights_for_document(&self, document_id: Uuid) -> Result<Vec<Insight>> {
        Ok(self
            .insights
            .read()
            .await
            .get(&document_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn put_job(&self, job: &AnalysisJob) -> Result<()> {
        self.jobs.write().await.insert(job.id, job.clone());
        Ok(())
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<AnalysisJob>> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn update_job(
        &self,
        id: Uuid,
        update: Box<dyn for<'a> FnOnce(&'a mut AnalysisJob) + Send>,
    ) -> Result<AnalysisJob> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(PipelineError::JobNotFound { id })?;
        update(job);
        Ok(job.clone())
    }
}

/// In-memory hybrid index keyed by document, so replacement is atomic per
/// document under the write lock.
#[derive(Default)]
pub struct MemoryIndex {
    entries: RwLock<HashMap<Uuid, Vec<IndexEntry>>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed entries across all documents.
    pub async fn len(&self) -> usize {
        self.entries.read().await.values().map(Vec::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn sort_hits(hits: &mut Vec<ChunkHit>, top_k: usize) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.published_at.cmp(&a.published_at))
    });
    hits.truncate(top_k);
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn replace_document(&self, document_id: Uuid, entries: Vec<IndexEntry>) -> Result<()> {
        self.entries.write().await.insert(document_id, entries);
        Ok(())
    }

    async fn remove_document(&self, document_id: Uuid) -> Result<()> {
        self.entries.write().await.remove(&document_id);
        Ok(())
    }

    async fn semantic_search(
        &self,
        embedding: &[f32],
        filter: &RetrievalFilter,
        top_k: usize,
    ) -> Result<Vec<ChunkHit>> {
        let entries = self.entries.read().await;
        let mut hits: Vec<ChunkHit> = entries
            .values()
            .flatten()
            .filter(|e| filter.matches(e.company_id, e.document_id, e.anchor_date))
            .map(|e| e.hit(cosine_similarity(embedding, &e.embedding)))
            .collect();
        sort_hits(&mut hits, top_k);
        Ok(hits)
    }
}

#[async_trait]
impl KeywordSearch for MemoryIndex {
    async fn keyword_search(
        &self,
        query: &str,
        filter: &RetrievalFilter,
        top_k: usize,
    ) -> Result<Vec<ChunkHit>> {
        let terms: Vec<String> = query
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.len() > 1)
            .map(String::from)
            .collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let entries = self.entries.read().await;
        let mut hits: Vec<ChunkHit> = entries
            .values()
            .flatten()
            .filter(|e| filter.matches(e.company_id, e.document_id, e.anchor_date))
            .filter_map(|e| {
                let tokens: Vec<String> = e
                    .text
                    .to_lowercase()
                    .split(|c: char| !c.is_alphanumeric())
                    .filter(|t| !t.is_empty())
                    .map(String::from)
                    .collect();
                let matched: usize = terms
                    .iter()
                    .map(|term| tokens.iter().filter(|t| *t == term).count())
                    .sum();
                if matched == 0 {
                    return None;
                }
                // Term frequency, damped by document length.
                let score = matched as f32 / (tokens.len() as f32).sqrt().max(1.0);
                Some(e.hit(score))
            })
            .collect();
        sort_hits(&mut hits, top_k);
        Ok(hits)
    }
}
