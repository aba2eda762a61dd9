//! Analysis-run job tracking.
//!
//! Jobs live in a [`JobStore`](crate::traits::store::JobStore) keyed by job
//! id with atomic status transitions; there is no ambient global queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Analysis-run lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    /// Whether the run has finished.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Per-document result within an analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentOutcomeStatus {
    Analyzed,
    Failed,
    /// Not processed because the run was cancelled first.
    Skipped,
}

/// Outcome of analyzing one document within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentOutcome {
    pub document_id: Uuid,
    pub status: DocumentOutcomeStatus,

    /// Candidate initiatives extracted from this document
    pub candidates: usize,

    /// Candidates merged into existing canonical initiatives
    pub merged: usize,

    /// Chunks whose extraction degraded to zero candidates
    pub failed_chunks: usize,

    pub error: Option<String>,
}

/// A tracked analysis run spanning one or more documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisJob {
    pub id: Uuid,
    pub company_id: Uuid,
    pub status: RunStatus,

    /// Monotonically increasing progress, 0–100.
    pub progress: u8,

    /// Total sub-steps across all stages for all documents.
    pub total_steps: usize,
    pub completed_steps: usize,

    pub outcomes: Vec<DocumentOutcome>,

    /// Human-readable reason when `status == Failed`
    pub error: Option<String>,

    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl AnalysisJob {
    /// Create a new queued job.
    pub fn new(company_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            company_id,
            status: RunStatus::Queued,
            progress: 0,
            total_steps: 0,
            completed_steps: 0,
            outcomes: Vec::new(),
            error: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Record completed sub-steps. Progress never decreases and caps at 99
    /// until the run reaches a terminal state.
    pub fn advance(&mut self, steps: usize) {
        self.completed_steps = (self.completed_steps + steps).min(self.total_steps);
        let pct = if self.total_steps == 0 {
            0
        } else {
            (self.completed_steps * 100 / self.total_steps) as u8
        };
        self.progress = self.progress.max(pct.min(99));
    }

    /// Mark the run as started.
    pub fn start(&mut self, total_steps: usize) {
        self.status = RunStatus::Running;
        self.total_steps = total_steps;
        self.started_at = Some(Utc::now());
    }

    /// Finish the run. A run fails only if every document in it failed;
    /// partial success is reported as completed with the per-document
    /// breakdown.
    pub fn finish(&mut self) {
        let all_failed = !self.outcomes.is_empty()
            && self
                .outcomes
                .iter()
                .all(|o| o.status == DocumentOutcomeStatus::Failed);
        self.status = if all_failed {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        };
        if all_failed && self.error.is_none() {
            self.error = Some("all documents failed analysis".to_string());
        }
        self.progress = 100;
        self.completed_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(status: DocumentOutcomeStatus) -> DocumentOutcome {
        DocumentOutcome {
            document_id: Uuid::new_v4(),
            status,
            candidates: 0,
            merged: 0,
            failed_chunks: 0,
            error: None,
        }
    }

    #[test]
    fn test_progress_is_monotone_and_capped() {
        let mut job = AnalysisJob::new(Uuid::new_v4());
        job.start(10);
        job.advance(5);
        assert_eq!(job.progress, 50);
        job.advance(5);
        assert_eq!(job.progress, 99); // capped until finish
        job.finish();
        assert_eq!(job.progress, 100);
    }

    #[test]
    fn test_partial_success_is_completed() {
        let mut job = AnalysisJob::new(Uuid::new_v4());
        job.start(2);
        job.outcomes.push(outcome(DocumentOutcomeStatus::Analyzed));
        job.outcomes.push(outcome(DocumentOutcomeStatus::Failed));
        job.finish();
        assert_eq!(job.status, RunStatus::Completed);
    }

    #[test]
    fn test_all_failed_is_failed() {
        let mut job = AnalysisJob::new(Uuid::new_v4());
        job.start(2);
        job.outcomes.push(outcome(DocumentOutcomeStatus::Failed));
        job.outcomes.push(outcome(DocumentOutcomeStatus::Failed));
        job.finish();
        assert_eq!(job.status, RunStatus::Failed);
        assert!(job.error.is_some());
    }

    #[test]
    fn test_zero_total_steps_does_not_divide_by_zero() {
        let mut job = AnalysisJob::new(Uuid::new_v4());
        job.start(0);
        job.advance(1);
        assert_eq!(job.progress, 0);
    }
}
