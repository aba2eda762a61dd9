//! Integration tests for the analysis flow.
//!
//! These exercise the full run: chunk extraction, scoring, outlook
//! classification, temporal normalization and cross-document merge, plus
//! run-level degradation, cancellation and the question-answering path.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use uuid::Uuid;

use initiatives::testing::{raw_initiative, MockBackend, MockExtractor, MockFailure};
use initiatives::{
    AnalysisConfig, AnalysisJob, AnalysisRequest, CanonicalInitiative, Document, DocumentOutcomeStatus,
    DocumentStore, DocumentType, FiscalPeriod, InitiativeCategory, InitiativeStore, MemoryIndex,
    MemoryStore, Outlook, Pipeline, PipelineConfig, RawInitiative, RetrievalFilter, RunStatus,
    SourceFormat,
};

type TestPipeline = Pipeline<MemoryStore, MemoryIndex, MockBackend, MockExtractor>;

fn fast_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.analysis = AnalysisConfig::default().with_retry_backoff_ms(10);
    config
}

fn build_pipeline(backend: MockBackend, extractor: MockExtractor) -> Arc<TestPipeline> {
    Arc::new(Pipeline::with_config(
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryIndex::new()),
        Arc::new(backend),
        Arc::new(extractor),
        fast_config(),
    ))
}

fn earnings_call(company: Uuid, title: &str, year: i32, quarter: u32) -> Document {
    Document::new(
        company,
        title,
        DocumentType::EarningsCall,
        SourceFormat::Txt,
        FiscalPeriod::quarter(year, quarter).end_date(),
    )
    .with_fiscal_period(FiscalPeriod::quarter(year, quarter))
}

async fn wait_for_job(pipeline: &TestPipeline, job_id: Uuid) -> AnalysisJob {
    for _ in 0..500 {
        let job = pipeline.get_job_status(job_id).await.unwrap();
        if job.status.is_terminal() {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("analysis job did not reach a terminal state");
}

async fn initiatives_for(pipeline: &TestPipeline, company: Uuid) -> Vec<CanonicalInitiative> {
    pipeline
        .store()
        .initiatives_for_company(company)
        .await
        .unwrap()
}

/// Two quarterly calls mentioning the same expansion: one canonical
/// initiative with evidence from both, dates spanning both quarters.
#[tokio::test]
async fn test_same_initiative_across_quarters_merges() {
    let company = Uuid::new_v4();
    let q2 = earnings_call(company, "Q2 2024 call", 2024, 2);
    let q3 = earnings_call(company, "Q3 2024 call", 2024, 3);

    let q2_quote = "we are beginning our expansion into Southeast Asia, starting with Vietnam";
    let q3_quote = "our Southeast Asia expansion is ahead of plan, adding stores in Thailand";

    let extractor = MockExtractor::new()
        .with_text(q2.id, format!("On guidance: {q2_quote}."))
        .with_text(q3.id, format!("An update: {q3_quote}."));
    let backend = MockBackend::new()
        .with_extraction(
            "Vietnam",
            vec![raw_initiative("Southeast Asia expansion", "expansion", q2_quote)],
        )
        .with_extraction(
            "Thailand",
            vec![raw_initiative("Southeast Asia expansion", "expansion", q3_quote)],
        );

    let pipeline = build_pipeline(backend, extractor);
    pipeline.store().put_document(&q2).await.unwrap();
    pipeline.store().put_document(&q3).await.unwrap();
    pipeline.run_ingestion(q2.id).await.unwrap();
    pipeline.run_ingestion(q3.id).await.unwrap();

    let job = pipeline
        .run_analysis(AnalysisRequest::for_company(company, "Acme Corp"))
        .await
        .unwrap();
    let job = wait_for_job(&pipeline, job.id).await;

    assert_eq!(job.status, RunStatus::Completed);
    assert_eq!(job.progress, 100);
    assert!(job
        .outcomes
        .iter()
        .all(|o| o.status == DocumentOutcomeStatus::Analyzed));

    let initiatives = initiatives_for(&pipeline, company).await;
    assert_eq!(initiatives.len(), 1);

    let init = &initiatives[0];
    assert_eq!(init.category, InitiativeCategory::Market);
    assert_eq!(init.mention_count, 2);
    assert_eq!(init.evidence.len(), 2);
    assert_eq!(init.document_count, 2);
    assert_eq!(
        init.first_mentioned_at,
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    );
    assert_eq!(
        init.last_mentioned_at,
        NaiveDate::from_ymd_opt(2024, 9, 30).unwrap()
    );
    assert!(init.first_mentioned_at <= init.last_mentioned_at);
}

/// Merge converges to the same canonical set regardless of which document
/// is analyzed first.
#[tokio::test]
async fn test_merge_is_order_independent() {
    let company = Uuid::new_v4();
    let q2 = earnings_call(company, "Q2 2024 call", 2024, 2);
    let q3 = earnings_call(company, "Q3 2024 call", 2024, 3);

    let extractor = MockExtractor::new()
        .with_text(q2.id, "We are entering Vietnam with new stores.")
        .with_text(q3.id, "Thailand store openings continue apace.");
    let backend = MockBackend::new()
        .with_extraction(
            "Vietnam",
            vec![raw_initiative("Southeast Asia expansion", "expansion", "entering Vietnam")],
        )
        .with_extraction(
            "Thailand",
            vec![raw_initiative("Southeast Asia expansion", "expansion", "Thailand openings")],
        );

    let pipeline = build_pipeline(backend, extractor);
    pipeline.store().put_document(&q2).await.unwrap();
    pipeline.store().put_document(&q3).await.unwrap();
    pipeline.run_ingestion(q2.id).await.unwrap();
    pipeline.run_ingestion(q3.id).await.unwrap();

    // Newest document first.
    let job = pipeline
        .run_analysis(
            AnalysisRequest::for_company(company, "Acme Corp").with_documents([q3.id, q2.id]),
        )
        .await
        .unwrap();
    wait_for_job(&pipeline, job.id).await;

    let initiatives = initiatives_for(&pipeline, company).await;
    assert_eq!(initiatives.len(), 1);
    assert_eq!(initiatives[0].mention_count, 2);
    assert_eq!(
        initiatives[0].first_mentioned_at,
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    );
    assert_eq!(
        initiatives[0].last_mentioned_at,
        NaiveDate::from_ymd_opt(2024, 9, 30).unwrap()
    );
}

/// Two runs for the same company started together still converge on a
/// single canonical initiative: merge passes are serialized per company,
/// so neither run reads the canonical set before the other commits.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_runs_converge_on_one_initiative() {
    let company = Uuid::new_v4();
    let q2 = earnings_call(company, "Q2 2024 call", 2024, 2);
    let q3 = earnings_call(company, "Q3 2024 call", 2024, 3);

    let extractor = MockExtractor::new()
        .with_text(q2.id, "We are entering Vietnam with new stores.")
        .with_text(q3.id, "Thailand store openings continue apace.");
    let backend = MockBackend::new()
        .with_extraction(
            "Vietnam",
            vec![raw_initiative("Southeast Asia expansion", "expansion", "entering Vietnam")],
        )
        .with_extraction(
            "Thailand",
            vec![raw_initiative("Southeast Asia expansion", "expansion", "Thailand openings")],
        );

    let pipeline = build_pipeline(backend, extractor);
    pipeline.store().put_document(&q2).await.unwrap();
    pipeline.store().put_document(&q3).await.unwrap();
    pipeline.run_ingestion(q2.id).await.unwrap();
    pipeline.run_ingestion(q3.id).await.unwrap();

    let first = pipeline
        .run_analysis(AnalysisRequest::for_company(company, "Acme Corp").with_documents([q2.id]))
        .await
        .unwrap();
    let second = pipeline
        .run_analysis(AnalysisRequest::for_company(company, "Acme Corp").with_documents([q3.id]))
        .await
        .unwrap();
    wait_for_job(&pipeline, first.id).await;
    wait_for_job(&pipeline, second.id).await;

    let initiatives = initiatives_for(&pipeline, company).await;
    assert_eq!(initiatives.len(), 1);
    assert_eq!(initiatives[0].mention_count, 2);
    assert_eq!(initiatives[0].evidence.len(), 2);
}

/// Re-running analysis over the same documents adds no duplicate evidence
/// and changes no counts.
#[tokio::test]
async fn test_reanalysis_is_idempotent() {
    let company = Uuid::new_v4();
    let doc = earnings_call(company, "Q2 2024 call", 2024, 2);

    let extractor =
        MockExtractor::new().with_text(doc.id, "Our Atlas modernization program is underway.");
    let backend = MockBackend::new().with_extraction(
        "Atlas",
        vec![raw_initiative("Atlas modernization", "technology", "Atlas program is underway")],
    );

    let pipeline = build_pipeline(backend, extractor);
    pipeline.store().put_document(&doc).await.unwrap();
    pipeline.run_ingestion(doc.id).await.unwrap();

    let request = AnalysisRequest::for_company(company, "Acme Corp");
    let first = pipeline.run_analysis(request.clone()).await.unwrap();
    wait_for_job(&pipeline, first.id).await;
    let second = pipeline.run_analysis(request).await.unwrap();
    wait_for_job(&pipeline, second.id).await;

    let initiatives = initiatives_for(&pipeline, company).await;
    assert_eq!(initiatives.len(), 1);
    assert_eq!(initiatives[0].mention_count, 1);
    assert_eq!(initiatives[0].evidence.len(), 1);
}

/// A chunk that keeps timing out degrades to zero candidates; the document
/// and the run still complete.
#[tokio::test]
async fn test_failing_chunk_degrades_without_failing_document() {
    let company = Uuid::new_v4();
    let doc = earnings_call(company, "Q2 2024 call", 2024, 2);

    let extractor = MockExtractor::new().with_text(doc.id, "A flaky passage about nothing.");
    let backend =
        MockBackend::new().with_extraction_failures("flaky", 3, MockFailure::Timeout);

    let pipeline = build_pipeline(backend, extractor);
    pipeline.store().put_document(&doc).await.unwrap();
    pipeline.run_ingestion(doc.id).await.unwrap();

    let job = pipeline
        .run_analysis(AnalysisRequest::for_company(company, "Acme Corp"))
        .await
        .unwrap();
    let job = wait_for_job(&pipeline, job.id).await;

    assert_eq!(job.status, RunStatus::Completed);
    let outcome = &job.outcomes[0];
    assert_eq!(outcome.status, DocumentOutcomeStatus::Analyzed);
    assert_eq!(outcome.failed_chunks, 1);
    assert_eq!(outcome.candidates, 0);
    assert!(initiatives_for(&pipeline, company).await.is_empty());
}

/// Transient rate limits are retried within the budget and the run
/// proceeds normally.
#[tokio::test]
async fn test_rate_limited_extraction_recovers() {
    let company = Uuid::new_v4();
    let doc = earnings_call(company, "Q2 2024 call", 2024, 2);

    let extractor = MockExtractor::new().with_text(doc.id, "The Zephyr launch is planned.");
    let backend = MockBackend::new()
        .with_extraction_failures("Zephyr", 2, MockFailure::RateLimited)
        .with_extraction(
            "Zephyr",
            vec![raw_initiative("Zephyr launch", "product", "Zephyr launch is planned")],
        );

    let pipeline = build_pipeline(backend, extractor);
    pipeline.store().put_document(&doc).await.unwrap();
    pipeline.run_ingestion(doc.id).await.unwrap();

    let job = pipeline
        .run_analysis(AnalysisRequest::for_company(company, "Acme Corp"))
        .await
        .unwrap();
    let job = wait_for_job(&pipeline, job.id).await;

    assert_eq!(job.status, RunStatus::Completed);
    assert_eq!(job.outcomes[0].candidates, 1);
    assert_eq!(job.outcomes[0].failed_chunks, 0);
    assert_eq!(initiatives_for(&pipeline, company).await.len(), 1);
}

/// The run fails only when every document in it fails.
#[tokio::test]
async fn test_run_fails_only_when_all_documents_fail() {
    let company = Uuid::new_v4();
    let doc = earnings_call(company, "Q2 2024 call", 2024, 2);

    let extractor = MockExtractor::new().with_text(doc.id, "The Borealis program begins.");
    // Deduplication embeds the candidate's similarity text; poisoning it
    // fails the document after extraction succeeded.
    let backend = MockBackend::new()
        .with_extraction(
            "Borealis",
            vec![RawInitiative {
                name: "Borealis program".to_string(),
                description: "An unembeddable poisoned description".to_string(),
                category: "strategy".to_string(),
                timeline: None,
                metrics: vec![],
                confidence: 0.9,
                evidence_quote: "the Borealis program begins".to_string(),
            }],
        )
        .with_embedding_failure("unembeddable");

    let pipeline = build_pipeline(backend, extractor);
    pipeline.store().put_document(&doc).await.unwrap();
    pipeline.run_ingestion(doc.id).await.unwrap();

    let job = pipeline
        .run_analysis(AnalysisRequest::for_company(company, "Acme Corp"))
        .await
        .unwrap();
    let job = wait_for_job(&pipeline, job.id).await;

    assert_eq!(job.status, RunStatus::Failed);
    assert_eq!(job.outcomes[0].status, DocumentOutcomeStatus::Failed);
    assert!(job.error.is_some());
}

/// Documents that never finished ingestion are skipped, not failed.
#[tokio::test]
async fn test_unprocessed_documents_are_skipped() {
    let company = Uuid::new_v4();
    let ingested = earnings_call(company, "good call", 2024, 2);
    let pending = earnings_call(company, "pending call", 2024, 3);

    let extractor = MockExtractor::new().with_text(ingested.id, "Plain remarks, nothing new.");
    let pipeline = build_pipeline(MockBackend::new(), extractor);
    pipeline.store().put_document(&ingested).await.unwrap();
    pipeline.store().put_document(&pending).await.unwrap();
    pipeline.run_ingestion(ingested.id).await.unwrap();

    let job = pipeline
        .run_analysis(AnalysisRequest::for_company(company, "Acme Corp"))
        .await
        .unwrap();
    let job = wait_for_job(&pipeline, job.id).await;

    assert_eq!(job.status, RunStatus::Completed);
    let skipped = job
        .outcomes
        .iter()
        .find(|o| o.document_id == pending.id)
        .unwrap();
    assert_eq!(skipped.status, DocumentOutcomeStatus::Skipped);
    assert_eq!(skipped.error.as_deref(), Some("document not ingested"));
}

/// Outlook classification and timeline normalization land on the merged
/// initiative.
#[tokio::test]
async fn test_outlook_and_timeline_are_populated() {
    let company = Uuid::new_v4();
    let doc = earnings_call(company, "Q2 2024 call", 2024, 2);

    let extractor = MockExtractor::new()
        .with_text(doc.id, "We will open our Nordic hub, targeting completion next year.");
    let backend = MockBackend::new()
        .with_extraction(
            "Nordic",
            vec![RawInitiative {
                name: "Nordic hub".to_string(),
                description: "Open a Nordic distribution hub".to_string(),
                category: "expansion".to_string(),
                timeline: Some("next fiscal year".to_string()),
                metrics: vec!["capacity".to_string()],
                confidence: 0.85,
                evidence_quote: "we will open our Nordic hub".to_string(),
            }],
        )
        .with_outlook("will open", Outlook::ForwardLooking);

    let pipeline = build_pipeline(backend, extractor);
    pipeline.store().put_document(&doc).await.unwrap();
    pipeline.run_ingestion(doc.id).await.unwrap();

    let job = pipeline
        .run_analysis(AnalysisRequest::for_company(company, "Acme Corp"))
        .await
        .unwrap();
    wait_for_job(&pipeline, job.id).await;

    let initiatives = initiatives_for(&pipeline, company).await;
    assert_eq!(initiatives.len(), 1);
    // "next fiscal year" anchored in Q2 2024 resolves to FY2025.
    assert_eq!(initiatives[0].timeline.as_deref(), Some("Jan 2025 – Dec 2025"));
    assert_eq!(initiatives[0].metrics, vec!["capacity".to_string()]);
}

/// A candidate with no stated timeline still lands with one: the
/// document's fiscal anchor, flagged approximate.
#[tokio::test]
async fn test_missing_timeline_defaults_to_fiscal_anchor() {
    let company = Uuid::new_v4();
    let doc = earnings_call(company, "Q2 2024 call", 2024, 2);

    let extractor = MockExtractor::new().with_text(doc.id, "The Helios program was announced.");
    // The fixture carries no timeline expression.
    let backend = MockBackend::new().with_extraction(
        "Helios",
        vec![raw_initiative("Helios program", "strategy", "the Helios program was announced")],
    );

    let pipeline = build_pipeline(backend, extractor);
    pipeline.store().put_document(&doc).await.unwrap();
    pipeline.run_ingestion(doc.id).await.unwrap();

    let job = pipeline
        .run_analysis(AnalysisRequest::for_company(company, "Acme Corp"))
        .await
        .unwrap();
    wait_for_job(&pipeline, job.id).await;

    let initiatives = initiatives_for(&pipeline, company).await;
    assert_eq!(initiatives.len(), 1);
    // Q2 2024 anchors on June 30; an unstated timeline inherits it.
    assert_eq!(initiatives[0].timeline.as_deref(), Some("~Jun 30, 2024"));
}

/// Cancellation stops new documents; the run ends failed with a
/// cancellation reason and later documents are skipped.
#[tokio::test]
async fn test_cancellation_skips_remaining_documents() {
    let company = Uuid::new_v4();
    let slow = earnings_call(company, "slow call", 2024, 2);
    let later = earnings_call(company, "later call", 2024, 3);

    let extractor = MockExtractor::new()
        .with_text(slow.id, "A sluggish passage that retries.")
        .with_text(later.id, "Ordinary remarks.");
    // Two timeouts with 200ms doubling backoff keep the first document
    // busy long enough for the cancel to land.
    let backend =
        MockBackend::new().with_extraction_failures("sluggish", 2, MockFailure::Timeout);

    let mut config = PipelineConfig::default();
    config.analysis = AnalysisConfig::default().with_retry_backoff_ms(200);
    let pipeline = Arc::new(Pipeline::with_config(
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryIndex::new()),
        Arc::new(backend),
        Arc::new(extractor),
        config,
    ));
    pipeline.store().put_document(&slow).await.unwrap();
    pipeline.store().put_document(&later).await.unwrap();
    pipeline.run_ingestion(slow.id).await.unwrap();
    pipeline.run_ingestion(later.id).await.unwrap();

    let job = pipeline
        .run_analysis(AnalysisRequest::for_company(company, "Acme Corp"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    pipeline.cancel_run(job.id).await.unwrap();

    let job = wait_for_job(&pipeline, job.id).await;
    assert_eq!(job.status, RunStatus::Failed);
    assert_eq!(job.error.as_deref(), Some("run cancelled"));
    let later_outcome = job
        .outcomes
        .iter()
        .find(|o| o.document_id == later.id)
        .unwrap();
    assert_eq!(later_outcome.status, DocumentOutcomeStatus::Skipped);

    // Cancelling a finished run is rejected.
    assert!(pipeline.cancel_run(job.id).await.is_err());
}

/// The question-answering path retrieves chunks and grounds citations in
/// them.
#[tokio::test]
async fn test_query_answers_with_grounded_citations() {
    let company = Uuid::new_v4();
    let doc = earnings_call(company, "Q2 2024 call", 2024, 2);

    let extractor = MockExtractor::new().with_text(
        doc.id,
        "Capital expenditure guidance was raised to two billion dollars.",
    );
    let pipeline = build_pipeline(MockBackend::new(), extractor);
    pipeline.store().put_document(&doc).await.unwrap();
    pipeline.run_ingestion(doc.id).await.unwrap();

    let answer = pipeline
        .query(
            "What is the capital expenditure guidance?",
            "Acme Corp",
            &RetrievalFilter::for_company(company),
        )
        .await
        .unwrap();

    assert!(!answer.answer.is_empty());
    assert!(!answer.citations.is_empty());
    assert_eq!(answer.citations[0].document_id, doc.id);

    // Nothing indexed for an unknown company: answered without a backend
    // call, zero confidence.
    let empty = pipeline
        .query(
            "What is the guidance?",
            "Nobody Inc",
            &RetrievalFilter::for_company(Uuid::new_v4()),
        )
        .await
        .unwrap();
    assert!(empty.citations.is_empty());
    assert_eq!(empty.confidence, 0.0);
}
