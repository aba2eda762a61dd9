//! Outlook classification: guidance versus reported fact.

use std::sync::Arc;

use tracing::warn;

use super::with_retries;
use crate::traits::ReasoningBackend;
use crate::types::{AnalysisConfig, CandidateInitiative, Outlook};

/// Labels candidates as forward- or backward-looking.
pub struct OutlookClassifier<B: ?Sized> {
    backend: Arc<B>,
    config: AnalysisConfig,
}

impl<B: ReasoningBackend + ?Sized> OutlookClassifier<B> {
    pub fn new(backend: Arc<B>, config: AnalysisConfig) -> Self {
        Self { backend, config }
    }

    /// Classify a candidate's first evidence quote. Failures leave the
    /// outlook unset rather than failing the candidate.
    pub async fn classify(&self, candidate: &mut CandidateInitiative) {
        let Some(evidence) = candidate.evidence.first() else {
            return;
        };
        let name = candidate.name.clone();
        let quote = evidence.quote.clone();

        match with_retries(&self.config, "classify_outlook", || {
            let backend = Arc::clone(&self.backend);
            let name = name.clone();
            let quote = quote.clone();
            async move { backend.classify_outlook(&name, &quote).await }
        })
        .await
        {
            Ok(outlook) => candidate.outlook = Some(outlook),
            Err(err) => {
                warn!(name = %candidate.name, error = %err, "outlook classification skipped");
            }
        }
    }
}

/// Keyword fallback used by tests and offline tooling: commitments phrased
/// in the future read as guidance.
pub fn heuristic_outlook(quote: &str) -> Outlook {
    let lower = quote.to_lowercase();
    let forward = ["will ", "plan", "expect", "intend", "going to", "aim to", "target"];
    if forward.iter().any(|kw| lower.contains(kw)) {
        Outlook::ForwardLooking
    } else {
        Outlook::BackwardLooking
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heuristic_outlook() {
        assert_eq!(
            heuristic_outlook("We will expand into three new markets"),
            Outlook::ForwardLooking
        );
        assert_eq!(
            heuristic_outlook("We completed the rollout last quarter"),
            Outlook::BackwardLooking
        );
    }
}
