//! Task Analyzer
//!
//! Classifies prompts into task categories and ranks candidate models for a
//! request. Classification is deliberately not a model: fixed keyword sets
//! scanned in a fixed priority order are fast, deterministic, and easy to
//! debug, the same trade the router's sensitivity scan makes.

use crate::registry::ModelDescriptor;
use sdk::errors::{OrchestrationError, Result};
use sdk::types::TaskCategory;
use tracing::debug;

const CODE_KEYWORDS: &[&str] = &[
    "code",
    "function",
    "class",
    "struct",
    "compile",
    "debug",
    "refactor",
    "algorithm",
    "implement",
    "bug",
    "script",
    "api",
    "regex",
    "syntax",
    "unit test",
];

const SYSTEM_COMMAND_KEYWORDS: &[&str] = &[
    "run command",
    "execute command",
    "shell",
    "terminal",
    "process list",
    "launch",
    "kill process",
];

const FILE_SYSTEM_KEYWORDS: &[&str] = &[
    "file",
    "folder",
    "directory",
    "path",
    "rename",
    "move file",
    "copy file",
    "list files",
    "disk",
];

const REASONING_KEYWORDS: &[&str] = &[
    "why",
    "explain",
    "reason",
    "logic",
    "prove",
    "deduce",
    "step by step",
    "analyze",
    "compare",
];

const SUMMARIZATION_KEYWORDS: &[&str] = &[
    "summarize",
    "summary",
    "tl;dr",
    "condense",
    "shorten",
    "key points",
    "recap",
];

const FINANCIAL_KEYWORDS: &[&str] = &[
    "stock",
    "invest",
    "portfolio",
    "budget",
    "revenue",
    "profit",
    "interest rate",
    "financial",
    "tax",
];

const TRANSLATION_KEYWORDS: &[&str] = &[
    "translate",
    "translation",
    "in french",
    "in german",
    "in spanish",
    "in japanese",
];

const CREATIVE_KEYWORDS: &[&str] = &[
    "story",
    "poem",
    "lyrics",
    "fiction",
    "creative",
    "imagine",
    "write a song",
];

fn keywords_for(category: TaskCategory) -> &'static [&'static str] {
    match category {
        TaskCategory::General => &[],
        TaskCategory::Code => CODE_KEYWORDS,
        TaskCategory::SystemCommand => SYSTEM_COMMAND_KEYWORDS,
        TaskCategory::FileSystem => FILE_SYSTEM_KEYWORDS,
        TaskCategory::Reasoning => REASONING_KEYWORDS,
        TaskCategory::Summarization => SUMMARIZATION_KEYWORDS,
        TaskCategory::Financial => FINANCIAL_KEYWORDS,
        TaskCategory::Translation => TRANSLATION_KEYWORDS,
        TaskCategory::Creative => CREATIVE_KEYWORDS,
    }
}

/// Categories in classification priority order: the three specially-ordered
/// ones first, then the rest in declaration order.
const CLASSIFY_ORDER: &[TaskCategory] = &[
    TaskCategory::Code,
    TaskCategory::SystemCommand,
    TaskCategory::FileSystem,
    TaskCategory::Reasoning,
    TaskCategory::Summarization,
    TaskCategory::Financial,
    TaskCategory::Translation,
    TaskCategory::Creative,
];

/// Classifies prompts and ranks candidates
#[derive(Debug, Clone, Default)]
pub struct TaskAnalyzer {
    /// Model id promoted to rank 0 for code tasks, when registered
    code_specialist: Option<String>,

    /// How many ranked candidates to return
    rank_limit: usize,
}

impl TaskAnalyzer {
    /// Create an analyzer returning the top 3 candidates
    pub fn new() -> Self {
        Self {
            code_specialist: None,
            rank_limit: 3,
        }
    }

    /// Set the code-specialist model id
    pub fn with_code_specialist(mut self, id: Option<String>) -> Self {
        self.code_specialist = id;
        self
    }

    /// Set how many ranked candidates are returned
    pub fn with_rank_limit(mut self, limit: usize) -> Self {
        self.rank_limit = limit.max(1);
        self
    }

    /// Determine the task category for a prompt
    ///
    /// A caller-provided category other than `General` is authoritative and
    /// returned unchanged. Otherwise the lowercased prompt is scanned
    /// against each category's keyword set in fixed priority order; the
    /// first set with any substring match wins, defaulting to `General`.
    pub fn classify(&self, prompt: &str, provided: TaskCategory) -> TaskCategory {
        if provided != TaskCategory::General {
            return provided;
        }

        let normalized = prompt.to_lowercase();

        for &category in CLASSIFY_ORDER {
            let keywords = keywords_for(category);
            if keywords.iter().any(|kw| normalized.contains(kw)) {
                debug!(%category, "prompt classified by keyword match");
                return category;
            }
        }

        TaskCategory::General
    }

    /// Rank candidates for `category`, best first, truncated to the
    /// configured limit
    ///
    /// Candidates that support the category are kept; when none do, the
    /// pool falls back to `General` supporters. The one category-specific
    /// override moves the configured code specialist to rank 0 for code
    /// tasks. The final order is a stable ascending sort on priority, so
    /// ties keep the caller's (registry) order.
    pub fn rank(
        &self,
        candidates: &[ModelDescriptor],
        category: TaskCategory,
    ) -> Result<Vec<ModelDescriptor>> {
        if candidates.is_empty() {
            return Err(OrchestrationError::NoModelsAvailable);
        }

        let mut pool: Vec<ModelDescriptor> = candidates
            .iter()
            .filter(|d| d.capabilities.supports(category))
            .cloned()
            .collect();

        if pool.is_empty() {
            pool = candidates
                .iter()
                .filter(|d| d.capabilities.supports(TaskCategory::General))
                .cloned()
                .collect();
        }

        if pool.is_empty() {
            return Err(OrchestrationError::NoSuitableModel(category.to_string()));
        }

        pool.sort_by_key(|d| d.priority);

        if category == TaskCategory::Code {
            if let Some(specialist) = &self.code_specialist {
                if let Some(pos) = pool.iter().position(|d| &d.id == specialist) {
                    let promoted = pool.remove(pos);
                    debug!(model_id = %promoted.id, "code specialist promoted to rank 0");
                    pool.insert(0, promoted);
                }
            }
        }

        pool.truncate(self.rank_limit);
        Ok(pool)
    }
}
