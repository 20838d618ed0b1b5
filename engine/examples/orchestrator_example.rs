//! Example demonstrating the full orchestration pipeline
//!
//! This example shows how a host application implements the `ModelBackend`
//! contract, registers backends, and drives requests through the
//! `Orchestrator`.

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use relay_engine::analyzer::TaskAnalyzer;
use relay_engine::diagnostics::SelfDiagnostics;
use relay_engine::events::EventBus;
use relay_engine::executor::ExecutionEngine;
use relay_engine::memory::MemoryContextManager;
use relay_engine::orchestrator::Orchestrator;
use relay_engine::registry::{ModelCapabilities, ModelDescriptor, ModelRegistry};
use sdk::errors::Result;
use sdk::types::{GenerationParams, ReasoningTier, TaskCategory};
use sdk::ModelBackend;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Mock backend for demonstration
struct MockBackend {
    name: String,
    loaded: AtomicBool,
}

impl MockBackend {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            loaded: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl ModelBackend for MockBackend {
    fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    async fn load(&self) -> Result<()> {
        println!("loading {}...", self.name);
        self.loaded.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn generate(&self, prompt: &str, _params: &GenerationParams) -> Result<String> {
        Ok(format!("[{}] response to: {}", self.name, prompt))
    }
}

#[tokio::main]
async fn main() -> AnyResult<()> {
    relay_engine::telemetry::init_telemetry();

    // Register two backends with different priorities and capabilities
    let registry = Arc::new(ModelRegistry::new());
    registry.register(
        ModelDescriptor::new(
            "swift-mini",
            "Swift Mini",
            ModelCapabilities::new(
                &[TaskCategory::General, TaskCategory::Summarization],
                ReasoningTier::Low,
                4096,
                true,
            ),
            1,
        ),
        Arc::new(MockBackend::new("swift-mini")),
    );
    registry.register(
        ModelDescriptor::new(
            "deep-coder",
            "Deep Coder",
            ModelCapabilities::new(
                &[TaskCategory::Code, TaskCategory::Reasoning],
                ReasoningTier::High,
                16384,
                true,
            ),
            2,
        ),
        Arc::new(MockBackend::new("deep-coder")),
    );

    // Assemble the pipeline
    let bus = Arc::new(EventBus::new());
    let engine = Arc::new(ExecutionEngine::new(Arc::clone(&registry)));
    let memory = Arc::new(MemoryContextManager::new(100));
    let diagnostics = Arc::new(SelfDiagnostics::new(Arc::clone(&registry), Arc::clone(&bus)));

    let orchestrator = Orchestrator::new(
        Arc::clone(&registry),
        TaskAnalyzer::new().with_code_specialist(Some("deep-coder".to_string())),
        engine,
        memory,
        diagnostics,
        bus,
    )
    .with_default_models(vec!["swift-mini".to_string(), "deep-coder".to_string()]);

    // Nothing is loaded yet; the orchestrator bootstraps a default model
    let answer = orchestrator
        .generate_text(
            "summarize the latest standup notes",
            TaskCategory::General,
            GenerationParams::default(),
        )
        .await?;
    println!("\nsummary request -> {answer}");

    // A code prompt routes to the code specialist once it's loaded
    registry.handle("deep-coder").expect("registered").load().await?;
    registry.set_load_state("deep-coder", true);

    let answer = orchestrator
        .generate_text(
            "write a function that merges two sorted lists",
            TaskCategory::General,
            GenerationParams::default(),
        )
        .await?;
    println!("code request    -> {answer}");

    // Diagnostics observed both successes
    for (model_id, metrics) in orchestrator.diagnostics().all_metrics() {
        println!(
            "{model_id}: {} runs, {} ok",
            metrics.total_executions, metrics.successful_executions
        );
    }

    Ok(())
}
