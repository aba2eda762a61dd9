//! Analysis flow: background runs over ingested documents.
//!
//! A run walks each document's chunks through extraction, scores and
//! classifies the candidates, normalizes their temporal references, then
//! hands the batch to the per-company deduplicator. Chunk extraction fans
//! out under a concurrency cap; deduplication is strictly serial so the
//! canonical set has a single writer.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::Pipeline;
use crate::dedup::Deduplicator;
use crate::error::{PipelineError, Result};
use crate::programs::{score_candidate, InitiativeExtractor, InsightExtractor, OutlookClassifier};
use crate::temporal::{normalize, TemporalAnchor};
use crate::traits::{HybridIndex, ReasoningBackend, Store, TextExtractor};
use crate::types::{
    AnalysisJob, CandidateInitiative, Document, DocumentOutcome, DocumentOutcomeStatus, Insight,
    ProcessingStatus, RunStatus,
};

/// What to analyze.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub company_id: Uuid,

    /// Company name passed through to extraction prompts
    pub company_name: String,

    /// Restrict to these documents; `None` analyzes every ingested
    /// document of the company.
    pub document_ids: Option<Vec<Uuid>>,
}

impl AnalysisRequest {
    pub fn for_company(company_id: Uuid, company_name: impl Into<String>) -> Self {
        Self {
            company_id,
            company_name: company_name.into(),
            document_ids: None,
        }
    }

    /// Restrict the run to a document subset.
    pub fn with_documents(mut self, ids: impl IntoIterator<Item = Uuid>) -> Self {
        self.document_ids = Some(ids.into_iter().collect());
        self
    }
}

enum ChunkResult {
    Done {
        candidates: Vec<CandidateInitiative>,
        degraded: bool,
        insights: Vec<Insight>,
    },
    Skipped,
}

impl<S, I, B, X> Pipeline<S, I, B, X>
where
    S: Store + 'static,
    I: HybridIndex + 'static,
    B: ReasoningBackend + 'static,
    X: TextExtractor + 'static,
{
    /// Start an analysis run. Returns the queued job immediately; the run
    /// proceeds in a background task and is observable through
    /// [`Pipeline::get_job_status`].
    pub async fn run_analysis(self: &Arc<Self>, request: AnalysisRequest) -> Result<AnalysisJob> {
        let documents = self.resolve_documents(&request).await?;

        let job = AnalysisJob::new(request.company_id);
        self.store.put_job(&job).await?;
        let token = self.register_cancellation(job.id);

        let pipeline = Arc::clone(self);
        let job_id = job.id;
        tokio::spawn(async move {
            pipeline
                .analysis_worker(job_id, request, documents, token)
                .await;
        });

        Ok(job)
    }

    /// Current state of a run.
    pub async fn get_job_status(&self, job_id: Uuid) -> Result<AnalysisJob> {
        self.store
            .get_job(job_id)
            .await?
            .ok_or(PipelineError::JobNotFound { id: job_id })
    }

    /// Request cancellation of a running analysis.
    ///
    /// In-flight backend calls complete; no new ones start. Documents not
    /// yet reached are recorded as skipped and the run ends failed with a
    /// cancellation reason.
    pub async fn cancel_run(&self, job_id: Uuid) -> Result<()> {
        let job = self.get_job_status(job_id).await?;
        if job.status.is_terminal() {
            return Err(PipelineError::InvalidState {
                reason: format!("job {job_id} already finished"),
            });
        }
        if let Ok(map) = self.cancellations.lock() {
            if let Some(token) = map.get(&job_id) {
                token.cancel();
            }
        }
        info!(%job_id, "cancellation requested");
        Ok(())
    }

    async fn resolve_documents(&self, request: &AnalysisRequest) -> Result<Vec<Document>> {
        match &request.document_ids {
            Some(ids) => {
                let mut documents = Vec::with_capacity(ids.len());
                for id in ids {
                    let doc = self
                        .store
                        .get_document(*id)
                        .await?
                        .ok_or(PipelineError::DocumentNotFound { id: *id })?;
                    if doc.company_id != request.company_id {
                        return Err(PipelineError::InvalidState {
                            reason: format!(
                                "document {id} does not belong to company {}",
                                request.company_id
                            ),
                        });
                    }
                    documents.push(doc);
                }
                Ok(documents)
            }
            None => self.store.documents_for_company(request.company_id).await,
        }
    }

    async fn analysis_worker(
        self: Arc<Self>,
        job_id: Uuid,
        request: AnalysisRequest,
        documents: Vec<Document>,
        token: CancellationToken,
    ) {
        // Each ingested document contributes one step per chunk plus one
        // for deduplication and one for finalization.
        let total_steps: usize = documents
            .iter()
            .filter(|d| d.status == ProcessingStatus::Completed)
            .map(|d| d.chunk_count + 2)
            .sum();

        if let Err(err) = self
            .store
            .update_job(job_id, Box::new(move |j| j.start(total_steps)))
            .await
        {
            error!(%job_id, error = %err, "could not start analysis job");
            self.drop_cancellation(job_id);
            return;
        }
        info!(%job_id, documents = documents.len(), "analysis run started");

        for document in &documents {
            let outcome = if token.is_cancelled() {
                DocumentOutcome {
                    document_id: document.id,
                    status: DocumentOutcomeStatus::Skipped,
                    candidates: 0,
                    merged: 0,
                    failed_chunks: 0,
                    error: Some("run cancelled".to_string()),
                }
            } else if document.status != ProcessingStatus::Completed {
                DocumentOutcome {
                    document_id: document.id,
                    status: DocumentOutcomeStatus::Skipped,
                    candidates: 0,
                    merged: 0,
                    failed_chunks: 0,
                    error: Some("document not ingested".to_string()),
                }
            } else {
                self.analyze_document(job_id, &request, document, &token)
                    .await
            };

            let push = self
                .store
                .update_job(job_id, Box::new(move |j| j.outcomes.push(outcome)))
                .await;
            if let Err(err) = push {
                error!(%job_id, error = %err, "could not record document outcome");
                self.drop_cancellation(job_id);
                return;
            }
        }

        let cancelled = token.is_cancelled();
        let finish = self
            .store
            .update_job(
                job_id,
                Box::new(move |j| {
                    if cancelled {
                        j.status = RunStatus::Failed;
                        j.error = Some("run cancelled".to_string());
                        j.completed_at = Some(chrono::Utc::now());
                    } else {
                        j.finish();
                    }
                }),
            )
            .await;
        match finish {
            Ok(job) => info!(%job_id, status = ?job.status, "analysis run finished"),
            Err(err) => error!(%job_id, error = %err, "could not finalize analysis job"),
        }
        self.drop_cancellation(job_id);
    }

    async fn analyze_document(
        &self,
        job_id: Uuid,
        request: &AnalysisRequest,
        document: &Document,
        token: &CancellationToken,
    ) -> DocumentOutcome {
        let failed = |error: String| DocumentOutcome {
            document_id: document.id,
            status: DocumentOutcomeStatus::Failed,
            candidates: 0,
            merged: 0,
            failed_chunks: 0,
            error: Some(error),
        };

        let chunks = match self.store.chunks_for_document(document.id).await {
            Ok(chunks) => chunks,
            Err(err) => return failed(format!("could not load chunks: {err}")),
        };

        let analysis = self.config.analysis.clone();
        let extractor = InitiativeExtractor::new(Arc::clone(&self.backend), analysis.clone());
        let insighter = analysis
            .extract_insights
            .then(|| InsightExtractor::new(Arc::clone(&self.backend), analysis.clone()));
        let semaphore = Arc::new(Semaphore::new(analysis.concurrency.max(1)));

        let tasks = chunks.iter().map(|chunk| {
            let semaphore = Arc::clone(&semaphore);
            let extractor = &extractor;
            let insighter = insighter.as_ref();
            let company_name = request.company_name.as_str();
            async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return ChunkResult::Skipped;
                };
                // Cancellation stops new backend calls; calls already in
                // flight on other chunks run to completion.
                if token.is_cancelled() {
                    return ChunkResult::Skipped;
                }
                let extraction = extractor.extract(document, chunk, company_name).await;
                let insights = match insighter {
                    Some(program) if !token.is_cancelled() => {
                        program.extract(document, chunk, company_name).await
                    }
                    _ => Vec::new(),
                };
                self.advance_job(job_id, 1).await;
                ChunkResult::Done {
                    candidates: extraction.candidates,
                    degraded: extraction.degraded,
                    insights,
                }
            }
        });

        let mut candidates: Vec<CandidateInitiative> = Vec::new();
        let mut insights: Vec<Insight> = Vec::new();
        let mut failed_chunks = 0usize;
        let mut skipped_chunks = 0usize;
        for result in join_all(tasks).await {
            match result {
                ChunkResult::Done {
                    candidates: mut c,
                    degraded,
                    insights: mut i,
                } => {
                    candidates.append(&mut c);
                    insights.append(&mut i);
                    if degraded {
                        failed_chunks += 1;
                    }
                }
                ChunkResult::Skipped => skipped_chunks += 1,
            }
        }

        if skipped_chunks > 0 {
            // Partial extraction under cancellation: discard rather than
            // dedup an incomplete batch.
            return DocumentOutcome {
                document_id: document.id,
                status: DocumentOutcomeStatus::Skipped,
                candidates: 0,
                merged: 0,
                failed_chunks,
                error: Some("run cancelled".to_string()),
            };
        }

        for insight in &insights {
            if let Err(err) = self.store.put_insight(insight).await {
                warn!(document_id = %document.id, error = %err, "could not store insight");
            }
        }

        // Corroboration: other candidates in this document that share a
        // name, case-insensitively.
        let mut by_name: HashMap<String, usize> = HashMap::new();
        for candidate in &candidates {
            *by_name.entry(candidate.name.to_lowercase()).or_default() += 1;
        }

        let anchor = TemporalAnchor::for_document(document);
        let classifier = analysis
            .classify_outlook
            .then(|| OutlookClassifier::new(Arc::clone(&self.backend), analysis.clone()));
        for candidate in &mut candidates {
            let corroborations = by_name
                .get(&candidate.name.to_lowercase())
                .copied()
                .unwrap_or(1)
                - 1;
            candidate.confidence = score_candidate(candidate, corroborations);
            if let Some(classifier) = &classifier {
                if !token.is_cancelled() {
                    classifier.classify(candidate).await;
                }
            }
            // A candidate without a stated timeline still gets one: the
            // document's own anchor, flagged approximate.
            candidate.timeline = Some(normalize(candidate.timeline_expr.as_deref(), &anchor));
        }

        let candidate_count = candidates.len();
        let dedup = Deduplicator::new(
            Arc::clone(&self.backend),
            self.config.dedup.clone(),
            analysis.clone(),
        );
        // One dedup pass per company at a time: concurrent runs over the
        // same company must not both read the canonical set before either
        // commits, or near-identical candidates fork into duplicates.
        let company_lock = self.dedup_lock(request.company_id);
        let _company_guard = company_lock.lock().await;
        let merged = match dedup
            .dedup_document(
                &*self.store,
                request.company_id,
                document.anchor_date(),
                candidates,
            )
            .await
        {
            Ok(outcome) => {
                self.advance_job(job_id, 1).await;
                outcome
            }
            Err(err) => {
                warn!(document_id = %document.id, error = %err, "deduplication failed");
                return failed(format!("deduplication failed: {err}"));
            }
        };
        self.advance_job(job_id, 1).await;

        info!(
            document_id = %document.id,
            candidates = candidate_count,
            merged = merged.merged,
            created = merged.created,
            failed_chunks,
            "document analyzed"
        );
        DocumentOutcome {
            document_id: document.id,
            status: DocumentOutcomeStatus::Analyzed,
            candidates: candidate_count,
            merged: merged.merged,
            failed_chunks,
            error: None,
        }
    }

    async fn advance_job(&self, job_id: Uuid, steps: usize) {
        if let Err(err) = self
            .store
            .update_job(job_id, Box::new(move |j| j.advance(steps)))
            .await
        {
            warn!(%job_id, error = %err, "could not advance job progress");
        }
    }
}
