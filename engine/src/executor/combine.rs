//! Output combination
//!
//! Reduces the ordered output list of a parallel fan-out to a single text.
//! Inputs arrive tagged with their source identity and their ordinal (the
//! position in the original candidate list), so every combination is
//! deterministic for a given candidate order.

use sdk::errors::{OrchestrationError, Result};
use std::collections::HashMap;

/// Characters kept when a combination truncates an output
pub const SNIPPET_LIMIT: usize = 200;

/// One backend's output, tagged with where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedOutput {
    /// Source label (model id, or provider/model for remote candidates)
    pub source: String,

    /// Position in the original candidate list
    pub ordinal: usize,

    /// The generated text
    pub text: String,
}

impl TaggedOutput {
    pub fn new(source: impl Into<String>, ordinal: usize, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ordinal,
            text: text.into(),
        }
    }
}

/// How parallel outputs are reduced to one result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combination {
    /// The output with the numerically smallest source ordinal — the
    /// candidate list position, not registry priority
    Best,

    /// All outputs in original order, each under a `=== SOURCE ===` header
    Concatenate,

    /// Numbered concatenation of outputs truncated to [`SNIPPET_LIMIT`]
    /// characters; a naive compression, not true summarization
    Summarize,

    /// Exact-string majority vote annotated `k/n`, first-seen order
    /// breaking ties
    Vote,
}

/// Apply `combination` to `outputs`
///
/// Fails with `NoModelsProvided` on an empty output list; a parallel join
/// that produced nothing has no meaningful combination.
pub fn combine(combination: Combination, outputs: &[TaggedOutput]) -> Result<String> {
    if outputs.is_empty() {
        return Err(OrchestrationError::NoModelsProvided);
    }

    let result = match combination {
        Combination::Best => best(outputs),
        Combination::Concatenate => concatenate(outputs),
        Combination::Summarize => summarize(outputs),
        Combination::Vote => vote(outputs),
    };

    Ok(result)
}

fn best(outputs: &[TaggedOutput]) -> String {
    let winner = outputs
        .iter()
        .min_by_key(|o| o.ordinal)
        .expect("outputs checked non-empty");
    winner.text.clone()
}

fn concatenate(outputs: &[TaggedOutput]) -> String {
    let mut combined = String::new();
    for output in outputs {
        combined.push_str(&format!("=== {} ===\n{}\n\n", output.source, output.text));
    }
    combined
}

fn summarize(outputs: &[TaggedOutput]) -> String {
    let mut combined = String::new();
    for (index, output) in outputs.iter().enumerate() {
        combined.push_str(&format!(
            "{}. [{}] {}\n",
            index + 1,
            output.source,
            truncate_chars(&output.text, SNIPPET_LIMIT)
        ));
    }
    combined
}

fn vote(outputs: &[TaggedOutput]) -> String {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for output in outputs {
        *counts.entry(output.text.as_str()).or_insert(0) += 1;
    }

    // First-seen order breaks ties, so scan the outputs rather than the map
    let mut winner: &TaggedOutput = &outputs[0];
    let mut winner_count = 0usize;
    for output in outputs {
        let count = counts[output.text.as_str()];
        if count > winner_count {
            winner = output;
            winner_count = count;
        }
    }

    format!(
        "{}\n\n({}/{} models agreed)",
        winner.text,
        winner_count,
        outputs.len()
    )
}

/// Truncate to `limit` characters, appending an ellipsis when cut
pub fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let cut: String = text.chars().take(limit).collect();
    format!("{}...", cut)
}
