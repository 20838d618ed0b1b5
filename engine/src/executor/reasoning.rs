//! Derived reasoning helpers
//!
//! None of these are strategies of their own: each is built purely from
//! repeated single executions with templated prompts and temperature
//! adjustments. They trade tokens for answer quality on hard prompts and
//! are exposed for hosts that want the knobs.

use crate::executor::ExecutionEngine;
use sdk::errors::{OrchestrationError, Result};
use sdk::types::RequestContext;
use tracing::debug;

/// Fixed step prefixes used by multi-step reasoning
const REASONING_STEPS: &[&str] = &[
    "Break the problem into its key parts:",
    "Work through each part in order, showing intermediate results:",
    "State the final answer based on the work above:",
];

impl ExecutionEngine {
    /// Iteratively refine an answer
    ///
    /// Generates an initial answer, then re-prompts `iterations - 1` more
    /// times, feeding the previous answer back for improvement and lowering
    /// the temperature by 0.1 each iteration after the first.
    pub async fn auto_refine(
        &self,
        model_id: &str,
        context: &RequestContext,
        iterations: usize,
    ) -> Result<String> {
        if iterations == 0 {
            return Err(OrchestrationError::Config(
                "auto_refine requires at least one iteration".to_string(),
            ));
        }

        let mut answer = self.execute_single(model_id, context).await?;

        for iteration in 1..iterations {
            let temperature = context.params.temperature - 0.1 * iteration as f64;
            let prompt = format!(
                "Original question:\n{}\n\nYour previous answer:\n{}\n\n\
                 Improve the answer: fix mistakes, fill gaps, and tighten the wording. \
                 Reply with the improved answer only.",
                context.prompt, answer
            );

            debug!(model_id, iteration, temperature, "refinement pass");
            let refined_context = context.with_prompt(prompt).with_temperature(temperature);
            answer = self.execute_single(model_id, &refined_context).await?;
        }

        Ok(answer)
    }

    /// Multi-step reasoning with fixed templated prefixes
    ///
    /// Each step's prompt carries the original problem plus the accumulated
    /// text of earlier steps; the final step's output is returned.
    pub async fn multi_step_reasoning(
        &self,
        model_id: &str,
        context: &RequestContext,
    ) -> Result<String> {
        let mut accumulated = String::new();
        let mut output = String::new();

        for (step, prefix) in REASONING_STEPS.iter().enumerate() {
            let prompt = if accumulated.is_empty() {
                format!("{}\n\n{}", prefix, context.prompt)
            } else {
                format!(
                    "{}\n\nProblem:\n{}\n\nWork so far:\n{}",
                    prefix, context.prompt, accumulated
                )
            };

            debug!(model_id, step, "reasoning step");
            output = self
                .execute_single(model_id, &context.with_prompt(prompt))
                .await?;

            accumulated.push_str(&output);
            accumulated.push('\n');
        }

        Ok(output)
    }

    /// One call with a think-step-by-step template
    pub async fn chain_of_thought(
        &self,
        model_id: &str,
        context: &RequestContext,
    ) -> Result<String> {
        let prompt = format!(
            "{}\n\nThink step by step before giving the final answer.",
            context.prompt
        );
        self.execute_single(model_id, &context.with_prompt(prompt))
            .await
    }

    /// Explore several approaches before answering
    ///
    /// One higher-temperature call proposes `breadth` candidate approaches
    /// (split naively on blank lines), each approach is developed with a
    /// further call, and one final lower-temperature call fuses the
    /// developed approaches into an answer.
    pub async fn tree_of_thought(
        &self,
        model_id: &str,
        context: &RequestContext,
        breadth: usize,
    ) -> Result<String> {
        let breadth = breadth.max(1);

        let brainstorm_prompt = format!(
            "List {} distinct approaches to the following problem. \
             Describe each approach in one paragraph and separate the paragraphs \
             with blank lines.\n\nProblem:\n{}",
            breadth, context.prompt
        );
        let brainstorm_context = context
            .with_prompt(brainstorm_prompt)
            .with_temperature(context.params.temperature + 0.2);
        let brainstorm = self.execute_single(model_id, &brainstorm_context).await?;

        let approaches: Vec<&str> = brainstorm
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .take(breadth)
            .collect();

        let mut developed = Vec::with_capacity(approaches.len());
        for (index, approach) in approaches.iter().enumerate() {
            debug!(model_id, approach = index, "developing approach");
            let develop_prompt = format!(
                "Problem:\n{}\n\nDevelop the following approach into a complete solution:\n{}",
                context.prompt, approach
            );
            let solution = self
                .execute_single(model_id, &context.with_prompt(develop_prompt))
                .await?;
            developed.push(solution);
        }

        let mut fuse_prompt = format!(
            "Problem:\n{}\n\nSeveral candidate solutions follow. \
             Produce the single best final answer, taking the strongest parts of each.\n",
            context.prompt
        );
        for (index, solution) in developed.iter().enumerate() {
            fuse_prompt.push_str(&format!("\nSolution {}:\n{}\n", index + 1, solution));
        }

        let fuse_context = context
            .with_prompt(fuse_prompt)
            .with_temperature(context.params.temperature - 0.2);
        self.execute_single(model_id, &fuse_context).await
    }
}
