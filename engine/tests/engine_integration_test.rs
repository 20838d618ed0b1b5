//! End-to-end tests for the execution engine: strategies, combinations,
//! hybrid pools, and the remote concurrency cap.

mod support;

use relay_engine::executor::combine::Combination;
use relay_engine::executor::{Candidate, ExecutionEngine, ExecutionStrategy};
use relay_engine::registry::{ModelCapabilities, ModelDescriptor, ModelRegistry};
use relay_engine::remote::{RemoteDispatcher, RemoteTarget};
use async_trait::async_trait;
use sdk::backend::RemoteExecutor;
use sdk::errors::{OrchestrationError, Result};
use sdk::types::{GenerationParams, ReasoningTier, RequestContext, TaskCategory};
use std::sync::Arc;
use support::ScriptedBackend;

fn descriptor(id: &str, priority: i32, tier: ReasoningTier) -> ModelDescriptor {
    let mut d = ModelDescriptor::new(
        id,
        id,
        ModelCapabilities::new(
            &[
                TaskCategory::General,
                TaskCategory::Reasoning,
                TaskCategory::Summarization,
            ],
            tier,
            8192,
            true,
        ),
        priority,
    );
    d.loaded = true;
    d
}

fn engine_with(backends: Vec<(&str, ScriptedBackend)>) -> (ExecutionEngine, Arc<ModelRegistry>) {
    let registry = Arc::new(ModelRegistry::new());
    for (i, (id, backend)) in backends.into_iter().enumerate() {
        registry.register(
            descriptor(id, i as i32, ReasoningTier::Medium),
            Arc::new(backend),
        );
        registry.set_load_state(id, true);
    }
    (ExecutionEngine::new(Arc::clone(&registry)), registry)
}

fn ctx(prompt: &str) -> RequestContext {
    RequestContext::new(prompt, TaskCategory::General, GenerationParams::default())
}

struct EchoRemote;

#[async_trait]
impl RemoteExecutor for EchoRemote {
    async fn execute_remote(
        &self,
        context: &RequestContext,
        model_id: &str,
        provider: &str,
    ) -> Result<String> {
        Ok(format!("{provider}/{model_id}:{}", context.prompt))
    }
}

#[tokio::test]
async fn test_strategy_dispatch_single() {
    let (engine, _) = engine_with(vec![
        ("first", ScriptedBackend::fixed("first answer")),
        ("second", ScriptedBackend::fixed("second answer")),
    ]);

    let candidates = vec![
        descriptor("first", 0, ReasoningTier::Medium),
        descriptor("second", 1, ReasoningTier::Medium),
    ];

    let out = engine
        .execute(ExecutionStrategy::Single, &candidates, &ctx("q"))
        .await
        .unwrap();
    assert_eq!(out, "first answer");
}

#[tokio::test]
async fn test_strategy_dispatch_chain_threads_prompts() {
    let (engine, _) = engine_with(vec![
        ("a", ScriptedBackend::echoing()),
        ("b", ScriptedBackend::echoing()),
    ]);

    let candidates = vec![
        descriptor("a", 0, ReasoningTier::Medium),
        descriptor("b", 1, ReasoningTier::Medium),
    ];

    let out = engine
        .execute(ExecutionStrategy::Chain, &candidates, &ctx("origin"))
        .await
        .unwrap();

    assert_eq!(out, "echo:echo:origin");
}

#[tokio::test]
async fn test_strategy_dispatch_parallel_concatenate() {
    let (engine, _) = engine_with(vec![
        ("alpha", ScriptedBackend::fixed("from alpha")),
        ("beta", ScriptedBackend::fixed("from beta")),
    ]);

    let candidates = vec![
        descriptor("alpha", 0, ReasoningTier::Medium),
        descriptor("beta", 1, ReasoningTier::Medium),
    ];

    let out = engine
        .execute(
            ExecutionStrategy::Parallel(Combination::Concatenate),
            &candidates,
            &ctx("q"),
        )
        .await
        .unwrap();

    assert!(out.find("=== alpha ===").unwrap() < out.find("=== beta ===").unwrap());
}

#[tokio::test]
async fn test_strategy_dispatch_empty_candidates() {
    let (engine, _) = engine_with(vec![]);
    let err = engine
        .execute(ExecutionStrategy::Auto, &[], &ctx("q"))
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestrationError::NoModelsProvided));
}

#[tokio::test]
async fn test_auto_summarization_fans_out() {
    let long_a = "sentence ".repeat(60);
    let (engine, _) = engine_with(vec![
        ("a", ScriptedBackend::fixed(long_a)),
        ("b", ScriptedBackend::fixed("short summary")),
    ]);

    let candidates = vec![
        descriptor("a", 0, ReasoningTier::Medium),
        descriptor("b", 1, ReasoningTier::Medium),
    ];
    let context = RequestContext::new(
        "summarize the report",
        TaskCategory::Summarization,
        GenerationParams::default(),
    );

    let out = engine
        .execute(ExecutionStrategy::Auto, &candidates, &context)
        .await
        .unwrap();

    // Numbered, truncated blocks from both candidates
    assert!(out.contains("1. [a]"));
    assert!(out.contains("2. [b]"));
    assert!(out.contains("..."));
}

#[tokio::test]
async fn test_hybrid_parallel_labels_remote_sources() {
    let registry = Arc::new(ModelRegistry::new());
    registry.register(
        descriptor("local-m", 0, ReasoningTier::Medium),
        Arc::new(ScriptedBackend::fixed("local says hi")),
    );
    registry.set_load_state("local-m", true);

    let dispatcher = Arc::new(RemoteDispatcher::new(Arc::new(EchoRemote), 3));
    let engine = ExecutionEngine::new(registry).with_remote(dispatcher);

    let pool = vec![
        Candidate::Local("local-m".to_string()),
        Candidate::Remote(RemoteTarget::new("gpt-4o-mini", "openai")),
    ];

    let out = engine
        .execute_hybrid_parallel(&pool, &ctx("ping"), Combination::Concatenate)
        .await
        .unwrap();

    assert!(out.contains("=== local-m ==="));
    assert!(out.contains("=== openai/gpt-4o-mini ==="));
    assert!(out.contains("local says hi"));
    assert!(out.contains("openai/gpt-4o-mini:ping"));
}

#[tokio::test]
async fn test_hybrid_chain_runs_locals_before_remotes() {
    let registry = Arc::new(ModelRegistry::new());
    registry.register(
        descriptor("local-m", 0, ReasoningTier::Medium),
        Arc::new(ScriptedBackend::echoing()),
    );
    registry.set_load_state("local-m", true);

    let dispatcher = Arc::new(RemoteDispatcher::new(Arc::new(EchoRemote), 3));
    let engine = ExecutionEngine::new(registry).with_remote(dispatcher);

    // Remote listed first, but the local candidate must run first
    let pool = vec![
        Candidate::Remote(RemoteTarget::new("gpt-4o-mini", "openai")),
        Candidate::Local("local-m".to_string()),
    ];

    let out = engine.execute_hybrid_chain(&pool, &ctx("seed")).await.unwrap();

    // The remote step received the local step's output as its prompt
    assert_eq!(out, "openai/gpt-4o-mini:echo:seed");
}

#[tokio::test]
async fn test_hybrid_auto_financial_votes_across_sources() {
    let registry = Arc::new(ModelRegistry::new());
    registry.register(
        descriptor("local-m", 0, ReasoningTier::Medium),
        Arc::new(ScriptedBackend::fixed("hold")),
    );
    registry.set_load_state("local-m", true);

    let dispatcher = Arc::new(RemoteDispatcher::new(Arc::new(EchoRemote), 3));
    let engine = ExecutionEngine::new(registry).with_remote(dispatcher);

    let pool = vec![
        Candidate::Local("local-m".to_string()),
        Candidate::Remote(RemoteTarget::new("gpt-4o-mini", "openai")),
    ];
    let context = RequestContext::new(
        "rebalance the portfolio",
        TaskCategory::Financial,
        GenerationParams::default(),
    );

    let out = engine.execute_hybrid_auto(&pool, &context).await.unwrap();
    assert!(out.contains("/2 models agreed"));
}

#[tokio::test]
async fn test_lazy_load_failure_maps_to_model_not_loaded() {
    let registry = Arc::new(ModelRegistry::new());
    registry.register(
        descriptor("dead", 0, ReasoningTier::Medium),
        Arc::new(ScriptedBackend::unloadable()),
    );

    let engine = ExecutionEngine::new(registry);
    let err = engine.execute_single("dead", &ctx("q")).await.unwrap_err();
    assert!(matches!(err, OrchestrationError::ModelNotLoaded(_)));
}

#[tokio::test]
async fn test_reasoning_helpers_compose_single_calls() {
    let (engine, _) = engine_with(vec![("m", ScriptedBackend::fixed("refined"))]);

    let out = engine.auto_refine("m", &ctx("question"), 2).await.unwrap();
    assert_eq!(out, "refined");

    let out = engine.chain_of_thought("m", &ctx("question")).await.unwrap();
    assert_eq!(out, "refined");
}
