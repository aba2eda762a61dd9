//! Confidence scoring for extracted candidates.
//!
//! Replaces the model's raw self-reported confidence with a calibrated
//! blend of that confidence, how specific the supporting quote is, and how
//! often the same initiative surfaced elsewhere in the document.

use crate::types::CandidateInitiative;

const MODEL_WEIGHT: f32 = 0.6;
const SPECIFICITY_WEIGHT: f32 = 0.2;
const CORROBORATION_WEIGHT: f32 = 0.2;

/// How concrete a quote is: length up to a saturation point, plus a bonus
/// for containing figures.
fn quote_specificity(quote: &str) -> f32 {
    let length_component = (quote.chars().count() as f32 / 160.0).min(1.0) * 0.7;
    let has_figures = quote.chars().any(|c| c.is_ascii_digit());
    let figure_component = if has_figures { 0.3 } else { 0.0 };
    length_component + figure_component
}

/// Score a candidate in [0, 1].
///
/// `corroborations` counts other candidates in the same document that the
/// deduplicator considers the same initiative.
pub fn score_candidate(candidate: &CandidateInitiative, corroborations: usize) -> f32 {
    let specificity = candidate
        .evidence
        .iter()
        .map(|e| quote_specificity(&e.quote))
        .fold(0.0_f32, f32::max);
    let corroboration = (corroborations as f32 / 3.0).min(1.0);

    let score = MODEL_WEIGHT * candidate.confidence
        + SPECIFICITY_WEIGHT * specificity
        + CORROBORATION_WEIGHT * corroboration;
    score.clamp(0.0, 1.0)
}
