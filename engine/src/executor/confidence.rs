//! Confidence-weighted combination
//!
//! A second family of combinations that scores each output before reducing.
//! Confidence is a cheap heuristic: a base of 0.5, a bonus for the source's
//! reasoning tier, and a length bonus capped at 0.2, clamped into [0, 1].
//! Longer answers from stronger tiers win; there is no model in the loop.

use crate::executor::combine::{truncate_chars, TaggedOutput, SNIPPET_LIMIT};
use sdk::errors::{OrchestrationError, Result};
use sdk::types::ReasoningTier;

/// Confidence heuristic for one output
///
/// `0.5 + tier bonus (0.1/0.2/0.3) + min(len/1000, 0.2)`, clamped to [0, 1].
pub fn confidence_score(tier: ReasoningTier, text: &str) -> f64 {
    let length_bonus = (text.len() as f64 / 1000.0).min(0.2);
    (0.5 + tier.confidence_bonus() + length_bonus).clamp(0.0, 1.0)
}

/// An output with its computed confidence
#[derive(Debug, Clone)]
pub struct ScoredOutput {
    pub output: TaggedOutput,
    pub confidence: f64,
}

impl ScoredOutput {
    /// Score `output` produced by a backend of `tier`
    pub fn new(output: TaggedOutput, tier: ReasoningTier) -> Self {
        let confidence = confidence_score(tier, &output.text);
        Self { output, confidence }
    }
}

/// Confidence-weighted reduction of parallel outputs
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WeightedCombination {
    /// Selects the single highest-confidence output. The name is
    /// historical; no averaging takes place.
    WeightedAverage,

    /// All outputs sorted by descending confidence, truncated to
    /// [`SNIPPET_LIMIT`] characters and annotated with their score
    Ensemble,

    /// Keep outputs with confidence >= the threshold, then behave as
    /// `WeightedAverage` over the survivors; an explicit message when none
    /// survive
    ConfidenceThreshold(f64),

    /// Placeholder: returns the first output's text unchanged. A real
    /// debate round is not implemented.
    Debate,
}

/// Apply `combination` to scored outputs
///
/// Fails with `NoModelsProvided` on an empty list.
pub fn combine_weighted(
    combination: WeightedCombination,
    scored: &[ScoredOutput],
) -> Result<String> {
    if scored.is_empty() {
        return Err(OrchestrationError::NoModelsProvided);
    }

    let result = match combination {
        WeightedCombination::WeightedAverage => highest_confidence(scored),
        WeightedCombination::Ensemble => ensemble(scored),
        WeightedCombination::ConfidenceThreshold(threshold) => {
            let survivors: Vec<ScoredOutput> = scored
                .iter()
                .filter(|s| s.confidence >= threshold)
                .cloned()
                .collect();

            if survivors.is_empty() {
                format!("No result met the confidence threshold {:.2}", threshold)
            } else {
                highest_confidence(&survivors)
            }
        }
        WeightedCombination::Debate => scored[0].output.text.clone(),
    };

    Ok(result)
}

fn highest_confidence(scored: &[ScoredOutput]) -> String {
    let winner = scored
        .iter()
        .max_by(|a, b| {
            a.confidence
                .partial_cmp(&b.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .expect("scored checked non-empty");
    winner.output.text.clone()
}

fn ensemble(scored: &[ScoredOutput]) -> String {
    let mut sorted: Vec<&ScoredOutput> = scored.iter().collect();
    sorted.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut combined = String::new();
    for entry in sorted {
        combined.push_str(&format!(
            "[{} | confidence {:.2}]\n{}\n\n",
            entry.output.source,
            entry.confidence,
            truncate_chars(&entry.output.text, SNIPPET_LIMIT)
        ));
    }
    combined
}
