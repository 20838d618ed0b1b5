//! Relay SDK
//!
//! Shared library providing the collaborator contracts, value types, and
//! error taxonomy for the relay orchestration engine. Host applications
//! implement the traits in [`backend`] (model handles, remote executors,
//! memory stores, command runners) and hand them to the engine at startup.

/// Collaborator contracts implemented by the host application
pub mod backend;

/// Error types and handling
pub mod errors;

/// Request/response value types shared across components
pub mod types;

// Re-export commonly used types
pub use backend::{
    CommandError, CommandOutcome, CommandRunner, KnowledgeSource, MemorySnippet, ModelBackend,
    RemoteExecutor, VectorMemory,
};
pub use errors::{OrchestrationError, OrchestrationErrorExt, Result};
pub use types::{GenerationParams, ReasoningTier, RequestContext, TaskCategory};
