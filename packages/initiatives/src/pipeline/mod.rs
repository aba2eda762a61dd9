//! Pipeline orchestration.
//!
//! [`Pipeline`] wires the trait seams together and owns the two flows:
//! ingestion (extract, chunk, embed, index) and analysis (extract
//! initiatives, score, classify, normalize, deduplicate). Analysis runs as
//! background jobs with progress tracking and cancellation.

mod analysis;
mod ingest;
mod query;

pub use analysis::AnalysisRequest;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::traits::{HybridIndex, ReasoningBackend, Store, TextExtractor};
use crate::types::PipelineConfig;

/// The document-analysis pipeline.
///
/// Generic over its storage, index, reasoning backend and text extractor
/// so tests run against in-memory implementations and deployments swap in
/// real ones.
pub struct Pipeline<S, I, B, X> {
    store: Arc<S>,
    index: Arc<I>,
    backend: Arc<B>,
    extractor: Arc<X>,
    config: PipelineConfig,

    /// Cancellation tokens for in-flight analysis runs, by job id.
    cancellations: Mutex<HashMap<Uuid, CancellationToken>>,

    /// Per-company guards serializing deduplication across concurrent
    /// runs; the canonical set has one writer per company at a time.
    dedup_locks: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl<S, I, B, X> Pipeline<S, I, B, X>
where
    S: Store + 'static,
    I: HybridIndex + 'static,
    B: ReasoningBackend + 'static,
    X: TextExtractor + 'static,
{
    pub fn new(store: Arc<S>, index: Arc<I>, backend: Arc<B>, extractor: Arc<X>) -> Self {
        Self::with_config(store, index, backend, extractor, PipelineConfig::default())
    }

    pub fn with_config(
        store: Arc<S>,
        index: Arc<I>,
        backend: Arc<B>,
        extractor: Arc<X>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            index,
            backend,
            extractor,
            config,
            cancellations: Mutex::new(HashMap::new()),
            dedup_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn register_cancellation(&self, job_id: Uuid) -> CancellationToken {
        let token = CancellationToken::new();
        if let Ok(mut map) = self.cancellations.lock() {
            map.insert(job_id, token.clone());
        }
        token
    }

    fn drop_cancellation(&self, job_id: Uuid) {
        if let Ok(mut map) = self.cancellations.lock() {
            map.remove(&job_id);
        }
    }

    fn dedup_lock(&self, company_id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = match self.dedup_locks.lock() {
            Ok(map) => map,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(map.entry(company_id).or_default())
    }
}
