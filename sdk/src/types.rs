//! Request/response value types
//!
//! These types flow between the host application, the orchestrator, and the
//! collaborator contracts. `RequestContext` is an immutable value: pipeline
//! stages that need a modified prompt or temperature build a derived copy
//! instead of mutating the original.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a generation request
///
/// Classification tests the categories in declaration order after the three
/// specially-ordered ones (Code, SystemCommand, FileSystem), so the order of
/// variants here is load-bearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    /// Generic requests with no stronger signal
    General,
    /// Programming: writing, reviewing, or explaining code
    Code,
    /// Requests that should run a system command instead of a model
    SystemCommand,
    /// Requests that operate on files and directories
    FileSystem,
    /// Multi-step logical reasoning
    Reasoning,
    /// Condensing a longer text
    Summarization,
    /// Financial analysis and calculations
    Financial,
    /// Translating between languages
    Translation,
    /// Creative writing
    Creative,
}

impl TaskCategory {
    /// All categories in declaration order
    pub const ALL: &'static [TaskCategory] = &[
        TaskCategory::General,
        TaskCategory::Code,
        TaskCategory::SystemCommand,
        TaskCategory::FileSystem,
        TaskCategory::Reasoning,
        TaskCategory::Summarization,
        TaskCategory::Financial,
        TaskCategory::Translation,
        TaskCategory::Creative,
    ];

    /// Whether this category is served by the command runner rather than
    /// the model pipeline
    pub fn is_command(&self) -> bool {
        matches!(self, TaskCategory::SystemCommand | TaskCategory::FileSystem)
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskCategory::General => "general",
            TaskCategory::Code => "code",
            TaskCategory::SystemCommand => "system_command",
            TaskCategory::FileSystem => "file_system",
            TaskCategory::Reasoning => "reasoning",
            TaskCategory::Summarization => "summarization",
            TaskCategory::Financial => "financial",
            TaskCategory::Translation => "translation",
            TaskCategory::Creative => "creative",
        };
        write!(f, "{}", name)
    }
}

/// Coarse capability rank of a backend, used for chain ordering and
/// confidence scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningTier {
    Low,
    Medium,
    High,
}

impl ReasoningTier {
    /// Additive confidence bonus contributed by this tier
    pub fn confidence_bonus(&self) -> f64 {
        match self {
            ReasoningTier::Low => 0.1,
            ReasoningTier::Medium => 0.2,
            ReasoningTier::High => 0.3,
        }
    }
}

impl fmt::Display for ReasoningTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReasoningTier::Low => write!(f, "low"),
            ReasoningTier::Medium => write!(f, "medium"),
            ReasoningTier::High => write!(f, "high"),
        }
    }
}

/// Sampling parameters passed through to backends unchanged
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Maximum number of tokens to generate
    pub max_tokens: usize,
    /// Sampling temperature
    pub temperature: f64,
    /// Nucleus sampling cutoff
    pub top_p: f64,
    /// Penalty applied to repeated tokens
    pub repetition_penalty: f64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            temperature: 0.7,
            top_p: 0.9,
            repetition_penalty: 1.1,
        }
    }
}

/// Immutable description of one generation request
///
/// Created per call and never mutated. Chain steps and refinement
/// iterations derive copies via [`RequestContext::with_prompt`] and
/// [`RequestContext::with_temperature`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    /// The prompt text sent to the backend
    pub prompt: String,
    /// Task category driving strategy selection
    pub category: TaskCategory,
    /// Sampling parameters
    pub params: GenerationParams,
}

impl RequestContext {
    /// Create a new request context
    pub fn new(prompt: impl Into<String>, category: TaskCategory, params: GenerationParams) -> Self {
        Self {
            prompt: prompt.into(),
            category,
            params,
        }
    }

    /// Create a context for a general request with default parameters
    pub fn general(prompt: impl Into<String>) -> Self {
        Self::new(prompt, TaskCategory::General, GenerationParams::default())
    }

    /// Derive a copy carrying a different prompt, all parameters unchanged
    pub fn with_prompt(&self, prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            category: self.category,
            params: self.params,
        }
    }

    /// Derive a copy carrying a different temperature, clamped to [0, 2]
    pub fn with_temperature(&self, temperature: f64) -> Self {
        let mut params = self.params;
        params.temperature = temperature.clamp(0.0, 2.0);
        Self {
            prompt: self.prompt.clone(),
            category: self.category,
            params,
        }
    }
}
