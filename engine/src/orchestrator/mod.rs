//! Orchestrator Facade
//!
//! The one explicitly-constructed context object composing registry,
//! analyzer, engine, memory, and diagnostics into the degrade-gracefully
//! request pipeline. A request is classified, command categories are
//! delegated to the command runner, and everything else walks the ranked
//! candidate list until a backend succeeds — first with the context-aware
//! prompt, then once more with the raw prompt if augmentation may have
//! been the problem.

use crate::analyzer::TaskAnalyzer;
use crate::config::Config;
use crate::diagnostics::{HealthState, SelfDiagnostics};
use crate::events::{Event, EventBus};
use crate::executor::ExecutionEngine;
use crate::memory::MemoryContextManager;
use crate::registry::{ModelDescriptor, ModelRegistry};
use crate::remote::RemoteDispatcher;
use sdk::backend::{CommandError, CommandRunner, KnowledgeSource, RemoteExecutor, VectorMemory};
use sdk::errors::{OrchestrationError, Result};
use sdk::types::{GenerationParams, RequestContext, TaskCategory};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Clears the busy flag on every exit path
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Optional collaborators injected when assembling from config
///
/// Everything is resolved once here; the engine never probes for a
/// collaborator's presence later.
#[derive(Default)]
pub struct Collaborators {
    pub vector_memory: Option<Arc<dyn VectorMemory>>,
    pub knowledge: Option<Arc<dyn KnowledgeSource>>,
    pub command_runner: Option<Arc<dyn CommandRunner>>,
    pub remote_executor: Option<Arc<dyn RemoteExecutor>>,
}

/// Top-level request pipeline
pub struct Orchestrator {
    registry: Arc<ModelRegistry>,
    analyzer: TaskAnalyzer,
    engine: Arc<ExecutionEngine>,
    memory: Arc<MemoryContextManager>,
    diagnostics: Arc<SelfDiagnostics>,
    bus: Arc<EventBus>,
    command_runner: Option<Arc<dyn CommandRunner>>,
    default_models: Vec<String>,
    context_items: usize,
    busy: AtomicBool,
}

impl Orchestrator {
    /// Compose the pipeline from its components
    pub fn new(
        registry: Arc<ModelRegistry>,
        analyzer: TaskAnalyzer,
        engine: Arc<ExecutionEngine>,
        memory: Arc<MemoryContextManager>,
        diagnostics: Arc<SelfDiagnostics>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            registry,
            analyzer,
            engine,
            memory,
            diagnostics,
            bus,
            command_runner: None,
            default_models: Vec::new(),
            context_items: 5,
            busy: AtomicBool::new(false),
        }
    }

    /// Assemble the whole pipeline from configuration
    ///
    /// Builds analyzer, engine, memory, diagnostics, and event bus with the
    /// knobs from `config`, wiring in whichever collaborators the host
    /// provides. The registry arrives populated; call
    /// [`MemoryContextManager::load_persisted`] via [`Orchestrator::memory`]
    /// afterwards to restore history.
    pub fn from_config(
        config: &Config,
        registry: Arc<ModelRegistry>,
        collaborators: Collaborators,
    ) -> Self {
        let bus = Arc::new(EventBus::new());

        let analyzer = TaskAnalyzer::new()
            .with_code_specialist(config.orchestrator.code_specialist.clone())
            .with_rank_limit(config.orchestrator.rank_limit);

        let mut engine = ExecutionEngine::new(Arc::clone(&registry)).with_generation_timeout(
            config
                .orchestrator
                .generation_timeout_secs
                .map(std::time::Duration::from_secs),
        );
        if let Some(executor) = collaborators.remote_executor {
            engine = engine.with_remote(Arc::new(RemoteDispatcher::new(
                executor,
                config.orchestrator.remote_concurrency,
            )));
        }

        let mut memory = MemoryContextManager::new(config.memory.capacity)
            .with_vector_memory(collaborators.vector_memory)
            .with_knowledge_source(collaborators.knowledge);
        if config.memory.persist {
            memory = memory.with_persistence(config.interactions_path());
        }

        let diagnostics = Arc::new(
            SelfDiagnostics::new(Arc::clone(&registry), Arc::clone(&bus))
                .with_auto_recovery(config.orchestrator.auto_recovery),
        );

        Self::new(
            registry,
            analyzer,
            Arc::new(engine),
            Arc::new(memory),
            diagnostics,
            bus,
        )
        .with_command_runner(collaborators.command_runner)
        .with_default_models(config.orchestrator.default_models.clone())
        .with_context_items(config.memory.context_items)
    }

    /// Attach a command runner for SystemCommand/FileSystem requests
    pub fn with_command_runner(mut self, runner: Option<Arc<dyn CommandRunner>>) -> Self {
        self.command_runner = runner;
        self
    }

    /// Ordered model ids to try loading when the loaded pool is empty
    pub fn with_default_models(mut self, models: Vec<String>) -> Self {
        self.default_models = models;
        self
    }

    /// How many items each memory layer contributes to augmented prompts
    pub fn with_context_items(mut self, items: usize) -> Self {
        self.context_items = items.max(1);
        self
    }

    /// Whether a request is currently in flight
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Current derived health state
    pub fn health(&self) -> HealthState {
        self.diagnostics.health()
    }

    /// The model catalog
    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// The diagnostics store
    pub fn diagnostics(&self) -> &Arc<SelfDiagnostics> {
        &self.diagnostics
    }

    /// The interaction history
    pub fn memory(&self) -> &Arc<MemoryContextManager> {
        &self.memory
    }

    /// The execution engine, for hosts driving strategies directly
    pub fn engine(&self) -> &Arc<ExecutionEngine> {
        &self.engine
    }

    /// The event bus the presentation layer subscribes to
    pub fn events(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Run the full pipeline for one prompt
    ///
    /// Command categories are delegated to the command runner and return a
    /// transcript without touching the model pipeline. Model categories
    /// walk the ranked candidates with the context-aware prompt, retry once
    /// with the raw prompt when augmentation made a difference, and surface
    /// the last failure only after everything was tried.
    pub async fn generate_text(
        &self,
        prompt: &str,
        category: TaskCategory,
        params: GenerationParams,
    ) -> Result<String> {
        self.busy.store(true, Ordering::SeqCst);
        let _guard = BusyGuard(&self.busy);

        let category = self.analyzer.classify(prompt, category);
        info!(%category, "generation request");
        self.bus
            .publish(Event::GenerationStarted {
                category: category.to_string(),
            })
            .await;

        if category.is_command() {
            return Ok(self.run_command(prompt).await);
        }

        let pool = self.loaded_pool_or_bootstrap().await?;

        let ranked = match self.analyzer.rank(&pool, category) {
            Ok(ranked) => ranked,
            Err(e) => {
                warn!(error = %e, "ranking failed; falling back to the full loaded pool");
                pool
            }
        };

        let context = RequestContext::new(prompt, category, params);
        let augmented = self
            .memory
            .generate_context_aware_prompt(prompt, &ranked[0].id, self.context_items)
            .await;

        let first_pass = self
            .try_candidates(&ranked, &context.with_prompt(augmented.clone()))
            .await;

        let outcome = match first_pass {
            Ok(success) => Ok(success),
            Err(first_error) => {
                if augmented != prompt {
                    // Augmentation can push a prompt past a context window
                    // or otherwise confuse a backend; one clean retry
                    info!("all candidates failed; retrying without memory context");
                    self.try_candidates(&ranked, &context)
                        .await
                        .map_err(|retry_error| retry_error.or(first_error))
                } else {
                    Err(first_error)
                }
            }
        };

        match outcome {
            Ok((model_id, response)) => {
                self.memory
                    .store_interaction(prompt, &response, std::slice::from_ref(&model_id));
                self.bus
                    .publish(Event::GenerationCompleted {
                        model_id: model_id.clone(),
                    })
                    .await;
                Ok(response)
            }
            Err(error) => {
                let error =
                    error.unwrap_or_else(|| OrchestrationError::ModelGenerationFailed {
                        model_id: "unknown".to_string(),
                        reason: "no candidate produced a response".to_string(),
                    });
                self.bus
                    .publish(Event::GenerationFailed {
                        error: error.to_string(),
                    })
                    .await;
                Err(error)
            }
        }
    }

    /// The loaded candidate pool, bootstrapping default models when empty
    async fn loaded_pool_or_bootstrap(&self) -> Result<Vec<ModelDescriptor>> {
        let pool = self.registry.list_loaded();
        if !pool.is_empty() {
            return Ok(pool);
        }

        for model_id in &self.default_models {
            let Some(handle) = self.registry.handle(model_id) else {
                debug!(%model_id, "default model not registered");
                continue;
            };

            match handle.load().await {
                Ok(()) if handle.is_loaded() => {
                    self.registry.set_load_state(model_id, true);
                    info!(%model_id, "default model loaded");
                    self.bus
                        .publish(Event::LoadStateChanged {
                            model_id: model_id.clone(),
                            loaded: true,
                        })
                        .await;
                    break;
                }
                _ => {
                    warn!(%model_id, "default model failed to load");
                }
            }
        }

        let pool = self.registry.list_loaded();
        if pool.is_empty() {
            return Err(OrchestrationError::NoModelsAvailable);
        }
        Ok(pool)
    }

    /// Linear fallback loop over ranked candidates
    ///
    /// Per-candidate failures are recorded in diagnostics and swallowed;
    /// the error returned is the last one captured (`None` only for an
    /// empty candidate list).
    async fn try_candidates(
        &self,
        ranked: &[ModelDescriptor],
        context: &RequestContext,
    ) -> std::result::Result<(String, String), Option<OrchestrationError>> {
        let mut last_error = None;

        for candidate in ranked {
            let start = Instant::now();
            match self.engine.execute_single(&candidate.id, context).await {
                Ok(response) => {
                    self.diagnostics
                        .record_success(
                            &candidate.id,
                            start.elapsed(),
                            context.prompt.len(),
                            response.len(),
                        )
                        .await;
                    return Ok((candidate.id.clone(), response));
                }
                Err(error) => {
                    warn!(model_id = %candidate.id, error = %error, "candidate failed; trying next");
                    self.diagnostics.record_failure(&candidate.id, &error).await;
                    last_error = Some(error);
                }
            }
        }

        Err(last_error)
    }

    /// Delegate a command-category prompt to the command runner
    ///
    /// The first whitespace token is the command, the rest are arguments.
    /// Rejections and failures come back as explanatory text; this path
    /// never returns an error.
    async fn run_command(&self, prompt: &str) -> String {
        let Some(runner) = &self.command_runner else {
            return "Command execution is not available: no command runner is configured."
                .to_string();
        };

        let mut parts = prompt.split_whitespace();
        let Some(command) = parts.next() else {
            return "No command given.".to_string();
        };
        let args: Vec<String> = parts.map(String::from).collect();

        debug!(command, "delegating to command runner");
        match runner.execute(command, &args).await {
            Ok(outcome) => {
                let mut transcript = format!("$ {} {}\n", command, args.join(" "));
                if !outcome.stdout.is_empty() {
                    transcript.push_str(&outcome.stdout);
                    if !outcome.stdout.ends_with('\n') {
                        transcript.push('\n');
                    }
                }
                if !outcome.stderr.is_empty() {
                    transcript.push_str(&format!("[stderr]\n{}\n", outcome.stderr));
                }
                transcript.push_str(&format!("(exit code {})", outcome.exit_code));
                transcript
            }
            Err(rejection) => explain_command_error(command, &rejection),
        }
    }
}

/// Turn a command-runner rejection into explanatory text
fn explain_command_error(command: &str, error: &CommandError) -> String {
    match error {
        CommandError::CommandNotAllowed(_) => {
            format!("The command '{}' is not on the allowed list.", command)
        }
        CommandError::DirectoryNotAllowed(dir) => {
            format!("The command '{}' may not run in '{}'.", command, dir)
        }
        CommandError::DangerousArguments(args) => format!(
            "The command '{}' was rejected because its arguments look dangerous: {}",
            command, args
        ),
        CommandError::ExecutionFailed(reason) => {
            format!("The command '{}' failed to execute: {}", command, reason)
        }
        CommandError::FileSystemError(reason) => {
            format!("A file system error stopped '{}': {}", command, reason)
        }
    }
}
