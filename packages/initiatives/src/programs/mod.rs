//! Extraction programs: the policy wrapped around backend calls.
//!
//! Each program owns one reasoning task (initiative extraction, outlook
//! classification, insight extraction, question answering) plus the retry
//! and normalization rules for it. Backends stay thin; programs are where
//! model output meets the domain types.

mod answerer;
mod extractor;
mod insights;
mod outlook;
mod scorer;

pub use answerer::{Answer, Citation, QuestionAnswerer};
pub use extractor::{ChunkExtraction, InitiativeExtractor};
pub use insights::InsightExtractor;
pub use outlook::{heuristic_outlook, OutlookClassifier};
pub use scorer::score_candidate;

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{BackendError, BackendResult};
use crate::types::AnalysisConfig;

/// Run a backend call with the configured retry budget.
///
/// Retryable errors (rate limits, timeouts) are retried up to
/// `max_attempts` total attempts with doubling backoff. A malformed
/// response gets exactly one retry. Everything else fails immediately.
pub(crate) async fn with_retries<T, F, Fut>(
    config: &AnalysisConfig,
    operation: &str,
    mut call: F,
) -> BackendResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = BackendResult<T>>,
{
    let mut attempt: u32 = 0;
    let mut invalid_retried = false;
    loop {
        attempt += 1;
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < config.max_attempts => {
                let backoff =
                    Duration::from_millis(config.retry_backoff_ms << (attempt - 1).min(8));
                warn!(operation, attempt, error = %err, "backend call failed, retrying");
                tokio::time::sleep(backoff).await;
            }
            Err(err @ BackendError::InvalidResponse { .. }) if !invalid_retried => {
                invalid_retried = true;
                warn!(operation, error = %err, "malformed response, retrying once");
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_retries_rate_limits_then_succeeds() {
        let calls = AtomicU32::new(0);
        let config = AnalysisConfig::default().with_max_attempts(3);
        let result = with_retries(&config, "test", || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(BackendError::RateLimited)
            } else {
                Ok(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_budget_returns_error() {
        let calls = AtomicU32::new(0);
        let config = AnalysisConfig::default().with_max_attempts(2);
        let result: BackendResult<()> = with_retries(&config, "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(BackendError::Timeout)
        })
        .await;
        assert!(matches!(result, Err(BackendError::Timeout)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalid_response_retried_once() {
        let calls = AtomicU32::new(0);
        let config = AnalysisConfig::default();
        let result: BackendResult<()> = with_retries(&config, "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(BackendError::InvalidResponse {
                reason: "not json".into(),
            })
        })
        .await;
        assert!(matches!(result, Err(BackendError::InvalidResponse { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_fails_immediately() {
        let calls = AtomicU32::new(0);
        let config = AnalysisConfig::default();
        let result: BackendResult<()> = with_retries(&config, "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(BackendError::Embedding("dimension mismatch".into()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
