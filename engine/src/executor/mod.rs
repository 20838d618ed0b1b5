//! Execution Engine
//!
//! Runs a request against one or more candidates according to a strategy:
//! a single call, a sequential chain, a concurrent fan-out with output
//! combination, or an automatic choice driven by the task category. Hybrid
//! variants treat local backends and remote provider targets as one logical
//! candidate pool.
//!
//! Every local backend call funnels through one choke point that performs
//! lazy loading and applies the optional generation timeout, so strategies
//! never talk to handles directly.

pub mod combine;
pub mod confidence;
mod reasoning;

use crate::registry::{ModelDescriptor, ModelRegistry};
use crate::remote::{RemoteDispatcher, RemoteTarget};
use combine::{combine, Combination, TaggedOutput};
use confidence::{combine_weighted, ScoredOutput, WeightedCombination};
use futures::future::join_all;
use sdk::errors::{OrchestrationError, Result};
use sdk::types::{RequestContext, TaskCategory};
use std::cmp::Reverse;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How candidates are invoked for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStrategy {
    /// Exactly one candidate
    Single,

    /// Sequential pipeline; each step's output is the next step's prompt
    Chain,

    /// Concurrent fan-out joined by an all-complete barrier, reduced by the
    /// given combination
    Parallel(Combination),

    /// Strategy chosen from the task category and candidate count
    Auto,
}

/// One member of a hybrid candidate pool
#[derive(Debug, Clone, PartialEq)]
pub enum Candidate {
    /// Registry model id
    Local(String),

    /// Remote (provider, model) pair
    Remote(RemoteTarget),
}

impl Candidate {
    /// Source label used when tagging outputs
    pub fn label(&self) -> String {
        match self {
            Candidate::Local(id) => id.clone(),
            Candidate::Remote(target) => target.label(),
        }
    }

    /// Whether this candidate runs on the local machine
    pub fn is_local(&self) -> bool {
        matches!(self, Candidate::Local(_))
    }
}

/// Strategy runner over the registry's backends
pub struct ExecutionEngine {
    registry: Arc<ModelRegistry>,
    remote: Option<Arc<RemoteDispatcher>>,
    generation_timeout: Option<Duration>,
}

impl ExecutionEngine {
    /// Create an engine over `registry` with no remote dispatch and no
    /// timeout
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self {
            registry,
            remote: None,
            generation_timeout: None,
        }
    }

    /// Attach a remote dispatcher, enabling hybrid strategies
    pub fn with_remote(mut self, dispatcher: Arc<RemoteDispatcher>) -> Self {
        self.remote = Some(dispatcher);
        self
    }

    /// Apply a per-call generation timeout to every local backend call
    pub fn with_generation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.generation_timeout = timeout;
        self
    }

    /// The one choke point for local backend calls: lazy load, optional
    /// timeout, error wrapping
    async fn call_backend(&self, model_id: &str, context: &RequestContext) -> Result<String> {
        let handle = self
            .registry
            .handle(model_id)
            .ok_or_else(|| OrchestrationError::ModelNotRegistered(model_id.to_string()))?;

        if !handle.is_loaded() {
            debug!(model_id, "backend not loaded; attempting lazy load");
            let load_result = handle.load().await;
            if load_result.is_err() || !handle.is_loaded() {
                if let Err(e) = load_result {
                    warn!(model_id, error = %e, "lazy load failed");
                }
                return Err(OrchestrationError::ModelNotLoaded(model_id.to_string()));
            }
            self.registry.set_load_state(model_id, true);
        }

        let generation = handle.generate(&context.prompt, &context.params);

        let output = match self.generation_timeout {
            Some(limit) => tokio::time::timeout(limit, generation).await.map_err(|_| {
                OrchestrationError::Timeout {
                    model_id: model_id.to_string(),
                    seconds: limit.as_secs(),
                }
            })?,
            None => generation.await,
        };

        output.map_err(|e| match e {
            already @ OrchestrationError::ModelGenerationFailed { .. } => already,
            other => OrchestrationError::ModelGenerationFailed {
                model_id: model_id.to_string(),
                reason: other.to_string(),
            },
        })
    }

    /// Execute exactly one candidate
    pub async fn execute_single(&self, model_id: &str, context: &RequestContext) -> Result<String> {
        debug!(model_id, "single execution");
        self.call_backend(model_id, context).await
    }

    /// Sequential pipeline over `model_ids`
    ///
    /// Step i's raw output becomes step i+1's prompt; all other parameters
    /// are held constant. Halts on the first failing step; returns the last
    /// step's output.
    pub async fn execute_chain(
        &self,
        model_ids: &[String],
        context: &RequestContext,
    ) -> Result<String> {
        if model_ids.is_empty() {
            return Err(OrchestrationError::NoModelsProvided);
        }

        let mut current = context.clone();
        let mut output = String::new();

        for (step, model_id) in model_ids.iter().enumerate() {
            debug!(%model_id, step, "chain step");
            output = self.call_backend(model_id, &current).await?;
            current = context.with_prompt(output.clone());
        }

        Ok(output)
    }

    /// Concurrent fan-out of the same context across `model_ids`
    ///
    /// Joins with an all-complete barrier: sibling executions are not
    /// cancelled when one fails, and the first failure in original
    /// candidate order is the one surfaced. On success all outputs, tagged
    /// with their source in candidate order, are reduced by `combination`.
    pub async fn execute_parallel(
        &self,
        model_ids: &[String],
        context: &RequestContext,
        combination: Combination,
    ) -> Result<String> {
        if model_ids.is_empty() {
            return Err(OrchestrationError::NoModelsProvided);
        }

        debug!(candidates = model_ids.len(), "parallel fan-out");
        let calls = model_ids.iter().map(|id| self.call_backend(id, context));
        let results = join_all(calls).await;

        let mut outputs = Vec::with_capacity(results.len());
        for (ordinal, (model_id, result)) in model_ids.iter().zip(results).enumerate() {
            outputs.push(TaggedOutput::new(model_id.clone(), ordinal, result?));
        }

        combine(combination, &outputs)
    }

    /// Parallel fan-out reduced by a confidence-weighted combination
    ///
    /// Confidence uses each candidate's reasoning tier, so this variant
    /// takes descriptors rather than bare ids.
    pub async fn execute_parallel_weighted(
        &self,
        candidates: &[ModelDescriptor],
        context: &RequestContext,
        combination: WeightedCombination,
    ) -> Result<String> {
        if candidates.is_empty() {
            return Err(OrchestrationError::NoModelsProvided);
        }

        let calls = candidates.iter().map(|d| self.call_backend(&d.id, context));
        let results = join_all(calls).await;

        let mut scored = Vec::with_capacity(results.len());
        for (ordinal, (descriptor, result)) in candidates.iter().zip(results).enumerate() {
            let output = TaggedOutput::new(descriptor.id.clone(), ordinal, result?);
            scored.push(ScoredOutput::new(
                output,
                descriptor.capabilities.reasoning_tier,
            ));
        }

        combine_weighted(combination, &scored)
    }

    /// Choose a strategy from the task category and candidate count
    ///
    /// One candidate always means a single call. Reasoning tasks chain
    /// candidates strongest-tier first; summarization fans out and
    /// compresses; financial fans out and votes; everything else runs the
    /// smallest-priority candidate alone.
    pub async fn execute_auto(
        &self,
        candidates: &[ModelDescriptor],
        context: &RequestContext,
    ) -> Result<String> {
        if candidates.is_empty() {
            return Err(OrchestrationError::NoModelsProvided);
        }

        if candidates.len() == 1 {
            return self.execute_single(&candidates[0].id, context).await;
        }

        match context.category {
            TaskCategory::Reasoning => {
                let mut ordered: Vec<&ModelDescriptor> = candidates.iter().collect();
                ordered.sort_by_key(|d| Reverse(d.capabilities.reasoning_tier));
                let ids: Vec<String> = ordered.iter().map(|d| d.id.clone()).collect();
                info!(steps = ids.len(), "auto: chaining by descending reasoning tier");
                self.execute_chain(&ids, context).await
            }
            TaskCategory::Summarization => {
                let ids: Vec<String> = candidates.iter().map(|d| d.id.clone()).collect();
                info!(candidates = ids.len(), "auto: parallel summarize");
                self.execute_parallel(&ids, context, Combination::Summarize)
                    .await
            }
            TaskCategory::Financial => {
                let ids: Vec<String> = candidates.iter().map(|d| d.id.clone()).collect();
                info!(candidates = ids.len(), "auto: parallel vote");
                self.execute_parallel(&ids, context, Combination::Vote).await
            }
            _ => {
                let preferred = candidates
                    .iter()
                    .min_by_key(|d| d.priority)
                    .expect("candidates checked non-empty");
                info!(model_id = %preferred.id, "auto: single on preferred candidate");
                self.execute_single(&preferred.id, context).await
            }
        }
    }

    /// Dispatch on an explicit strategy
    pub async fn execute(
        &self,
        strategy: ExecutionStrategy,
        candidates: &[ModelDescriptor],
        context: &RequestContext,
    ) -> Result<String> {
        if candidates.is_empty() {
            return Err(OrchestrationError::NoModelsProvided);
        }

        match strategy {
            ExecutionStrategy::Single => self.execute_single(&candidates[0].id, context).await,
            ExecutionStrategy::Chain => {
                let ids: Vec<String> = candidates.iter().map(|d| d.id.clone()).collect();
                self.execute_chain(&ids, context).await
            }
            ExecutionStrategy::Parallel(combination) => {
                let ids: Vec<String> = candidates.iter().map(|d| d.id.clone()).collect();
                self.execute_parallel(&ids, context, combination).await
            }
            ExecutionStrategy::Auto => self.execute_auto(candidates, context).await,
        }
    }

    /// Run one member of a hybrid pool
    async fn execute_candidate(
        &self,
        candidate: &Candidate,
        context: &RequestContext,
    ) -> Result<String> {
        match candidate {
            Candidate::Local(id) => self.call_backend(id, context).await,
            Candidate::Remote(target) => match &self.remote {
                Some(dispatcher) => dispatcher.execute(context, target).await,
                None => Err(OrchestrationError::ExecutorUnavailable),
            },
        }
    }

    /// Hybrid single: prefer a local candidate when any exist
    pub async fn execute_hybrid_single(
        &self,
        pool: &[Candidate],
        context: &RequestContext,
    ) -> Result<String> {
        let chosen = pool
            .iter()
            .find(|c| c.is_local())
            .or_else(|| pool.first())
            .ok_or(OrchestrationError::NoModelsProvided)?;

        debug!(source = %chosen.label(), "hybrid single execution");
        self.execute_candidate(chosen, context).await
    }

    /// Hybrid chain: all local candidates run before remote ones
    pub async fn execute_hybrid_chain(
        &self,
        pool: &[Candidate],
        context: &RequestContext,
    ) -> Result<String> {
        if pool.is_empty() {
            return Err(OrchestrationError::NoModelsProvided);
        }

        let ordered: Vec<&Candidate> = pool
            .iter()
            .filter(|c| c.is_local())
            .chain(pool.iter().filter(|c| !c.is_local()))
            .collect();

        let mut current = context.clone();
        let mut output = String::new();

        for candidate in ordered {
            debug!(source = %candidate.label(), "hybrid chain step");
            output = self.execute_candidate(candidate, &current).await?;
            current = context.with_prompt(output.clone());
        }

        Ok(output)
    }

    /// Hybrid auto: the auto decision table applied to a mixed pool
    ///
    /// Remote candidates carry no reasoning tier, so reasoning tasks fall
    /// back to the hybrid chain's locals-first order instead of a tier
    /// sort.
    pub async fn execute_hybrid_auto(
        &self,
        pool: &[Candidate],
        context: &RequestContext,
    ) -> Result<String> {
        if pool.is_empty() {
            return Err(OrchestrationError::NoModelsProvided);
        }

        if pool.len() == 1 {
            return self.execute_candidate(&pool[0], context).await;
        }

        match context.category {
            TaskCategory::Reasoning => self.execute_hybrid_chain(pool, context).await,
            TaskCategory::Summarization => {
                self.execute_hybrid_parallel(pool, context, Combination::Summarize)
                    .await
            }
            TaskCategory::Financial => {
                self.execute_hybrid_parallel(pool, context, Combination::Vote)
                    .await
            }
            _ => self.execute_hybrid_single(pool, context).await,
        }
    }

    /// Hybrid parallel: fan out across the union, labeling results by
    /// source
    pub async fn execute_hybrid_parallel(
        &self,
        pool: &[Candidate],
        context: &RequestContext,
        combination: Combination,
    ) -> Result<String> {
        if pool.is_empty() {
            return Err(OrchestrationError::NoModelsProvided);
        }

        let calls = pool.iter().map(|c| self.execute_candidate(c, context));
        let results = join_all(calls).await;

        let mut outputs = Vec::with_capacity(results.len());
        for (ordinal, (candidate, result)) in pool.iter().zip(results).enumerate() {
            outputs.push(TaggedOutput::new(candidate.label(), ordinal, result?));
        }

        combine(combination, &outputs)
    }
}
