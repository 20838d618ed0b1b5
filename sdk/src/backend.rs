//! Collaborator contracts
//!
//! The engine is a library: everything that touches the outside world — a
//! local inference runtime, a cloud provider's HTTP API, a vector store, a
//! knowledge base, a sandboxed command executor — is implemented by the host
//! application behind one of these traits and injected at construction.
//! Optional collaborators are passed as `Option<Arc<dyn Trait>>`; the engine
//! never probes for their presence at runtime.

use crate::errors::{OrchestrationError, Result};
use crate::types::{GenerationParams, RequestContext};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Handle to a single generation backend (local model or API wrapper)
///
/// Implementations are expected to be cheap to query for load state and to
/// tolerate concurrent `generate` calls, or serialize them internally.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Whether the backend is currently loaded and able to generate
    fn is_loaded(&self) -> bool;

    /// Load the backend (weights, session, connection)
    async fn load(&self) -> Result<()>;

    /// Generate a completion for `prompt` under `params`
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String>;
}

/// Executor for remote provider APIs
///
/// Implementations own the wire-level HTTP client and credential lookup.
/// Failures surface as [`OrchestrationError::MissingCredential`],
/// [`OrchestrationError::ProviderError`], or
/// [`OrchestrationError::InvalidResponse`]. The engine wraps every call in
/// a bounded-concurrency dispatcher, so implementations do not need their
/// own limiter.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Execute `context` against `model_id` at `provider`, returning the
    /// generated text
    async fn execute_remote(
        &self,
        context: &RequestContext,
        model_id: &str,
        provider: &str,
    ) -> Result<String>;
}

/// A snippet retrieved from similarity search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySnippet {
    /// The stored content
    pub content: String,
    /// Where the content came from (model id, document name, ...)
    pub source: String,
}

impl MemorySnippet {
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
        }
    }
}

/// Vector similarity store for long-term memory
#[async_trait]
pub trait VectorMemory: Send + Sync {
    /// Store content with its embedding
    async fn add_item(
        &self,
        content: &str,
        embedding: Vec<f32>,
        source: &str,
        tags: Vec<String>,
    ) -> Result<()>;

    /// Return up to `limit` snippets most similar to `query`, best first
    async fn search_similar(&self, query: &str, limit: usize) -> Vec<MemorySnippet>;
}

/// External knowledge base (documentation, wikis, ticket systems)
#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    /// Return up to `limit` items relevant to `query`, best first
    async fn relevant_items(&self, query: &str, limit: usize) -> Vec<String>;
}

/// Result of a system command execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandOutcome {
    /// Process exit code
    pub exit_code: i32,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
}

impl CommandOutcome {
    /// Whether the command exited successfully
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Errors a command runner may reject or fail with
///
/// Sandboxing and allow-listing policy live inside the runner; the engine
/// treats every rejection as text to explain to the user, never as a reason
/// to touch the model pipeline.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Command not allowed: {0}")]
    CommandNotAllowed(String),

    #[error("Directory not allowed: {0}")]
    DirectoryNotAllowed(String),

    #[error("Dangerous arguments detected: {0}")]
    DangerousArguments(String),

    #[error("Command execution failed: {0}")]
    ExecutionFailed(String),

    #[error("File system error: {0}")]
    FileSystemError(String),
}

/// Sandboxed system command executor
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Execute `command` with `args`, returning the captured outcome
    async fn execute(
        &self,
        command: &str,
        args: &[String],
    ) -> std::result::Result<CommandOutcome, CommandError>;
}

/// Map an arbitrary backend failure into the engine's generation-failure
/// variant; a convenience for backend implementations wrapping foreign
/// error types
pub fn generation_failure(model_id: &str, reason: impl Into<String>) -> OrchestrationError {
    OrchestrationError::ModelGenerationFailed {
        model_id: model_id.to_string(),
        reason: reason.into(),
    }
}
