//! Error types and handling
//!
//! This module provides the error taxonomy used throughout the relay engine.
//! All errors implement the `OrchestrationErrorExt` trait which provides
//! user-friendly hints and indicates whether errors are recoverable.
//!
//! Error messages never contain credentials; provider errors carry only the
//! HTTP status and a scrubbed message safe to show to end users.

use thiserror::Error;

/// Result type for orchestration operations
pub type Result<T> = std::result::Result<T, OrchestrationError>;

/// Trait for orchestration error extensions
///
/// Provides additional context for errors: a hint safe to display to end
/// users, and whether the error is worth retrying or routing around.
pub trait OrchestrationErrorExt {
    /// Returns a user-friendly hint for the error
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried on another candidate or with
    /// adjusted input. Non-recoverable errors mean the request as posed
    /// cannot succeed against the current pool.
    fn is_recoverable(&self) -> bool;
}

/// Main orchestration error type
///
/// # Error Categories
///
/// - **Candidate pool**: empty or exhausted candidate sets
/// - **Model lifecycle**: registration and load-state failures
/// - **Generation**: backend failures and timeouts
/// - **Remote**: credential, provider, and response-format failures
/// - **Infrastructure**: configuration, persistence, IO
#[derive(Debug, Error)]
pub enum OrchestrationError {
    // Candidate pool errors
    #[error("No models provided")]
    NoModelsProvided,

    #[error("No models available")]
    NoModelsAvailable,

    #[error("No suitable model for category: {0}")]
    NoSuitableModel(String),

    // Model lifecycle errors
    #[error("Model not registered: {0}")]
    ModelNotRegistered(String),

    #[error("Model not loaded: {0}")]
    ModelNotLoaded(String),

    #[error("Model load failed for {model_id}: {reason}")]
    LoadFailed { model_id: String, reason: String },

    // Generation errors
    #[error("Generation failed on {model_id}: {reason}")]
    ModelGenerationFailed { model_id: String, reason: String },

    #[error("Generation timed out after {seconds}s on {model_id}")]
    Timeout { model_id: String, seconds: u64 },

    #[error("Executor unavailable")]
    ExecutorUnavailable,

    // Remote provider errors
    #[error("Missing API credential for provider: {0}")]
    MissingCredential(String),

    #[error("Provider error (status {status}): {message}")]
    ProviderError { status: u16, message: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    // Infrastructure errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OrchestrationErrorExt for OrchestrationError {
    fn user_hint(&self) -> &str {
        match self {
            Self::NoModelsProvided => "Provide at least one candidate model",
            Self::NoModelsAvailable => "No models are loaded. Load or register a backend first",
            Self::NoSuitableModel(_) => "No loaded model supports this task category",
            Self::ModelNotRegistered(_) => "The requested model is not in the registry",
            Self::ModelNotLoaded(_) => "The model could not be loaded. Check backend availability",
            Self::LoadFailed { .. } => "Model loading failed. Check backend logs",
            Self::ModelGenerationFailed { .. } => {
                "Generation failed. Another candidate may succeed"
            }
            Self::Timeout { .. } => "The backend took too long to respond. Try again",
            Self::ExecutorUnavailable => "This capability is not configured",
            Self::MissingCredential(_) => "Add an API key for this provider",
            Self::ProviderError { .. } => "The remote provider rejected the request",
            Self::InvalidResponse(_) => "The remote provider returned an unexpected format",
            Self::Config(_) => "Check your config.toml file for errors",
            Self::Persistence(_) => "Interaction history could not be saved",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // Exhausted pools and structural absences are terminal for the
            // request as posed
            Self::NoModelsProvided
            | Self::NoModelsAvailable
            | Self::NoSuitableModel(_)
            | Self::ExecutorUnavailable
            | Self::Config(_) => false,

            // Everything else can be retried on another candidate or after
            // an intervention (load, credential fix, parameter change)
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_model_id() {
        let err = OrchestrationError::ModelGenerationFailed {
            model_id: "phi-3".to_string(),
            reason: "backend crashed".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("phi-3"));
        assert!(text.contains("backend crashed"));
    }

    #[test]
    fn test_pool_errors_are_not_recoverable() {
        assert!(!OrchestrationError::NoModelsAvailable.is_recoverable());
        assert!(!OrchestrationError::NoModelsProvided.is_recoverable());
        assert!(!OrchestrationError::NoSuitableModel("financial".to_string()).is_recoverable());
    }

    #[test]
    fn test_generation_errors_are_recoverable() {
        let err = OrchestrationError::ModelGenerationFailed {
            model_id: "m".to_string(),
            reason: "oom".to_string(),
        };
        assert!(err.is_recoverable());
        assert!(OrchestrationError::ModelNotLoaded("m".to_string()).is_recoverable());
    }

    #[test]
    fn test_every_variant_has_a_hint() {
        let samples: Vec<OrchestrationError> = vec![
            OrchestrationError::NoModelsProvided,
            OrchestrationError::NoModelsAvailable,
            OrchestrationError::NoSuitableModel("x".into()),
            OrchestrationError::ModelNotRegistered("x".into()),
            OrchestrationError::ModelNotLoaded("x".into()),
            OrchestrationError::MissingCredential("openai".into()),
            OrchestrationError::ProviderError {
                status: 429,
                message: "rate limited".into(),
            },
            OrchestrationError::InvalidResponse("no choices".into()),
        ];
        for err in samples {
            assert!(!err.user_hint().is_empty());
        }
    }
}
