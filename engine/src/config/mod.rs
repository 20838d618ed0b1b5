//! Configuration management
//!
//! This module handles loading, validation, and management of the relay
//! configuration. Configuration is stored in TOML format at
//! ~/.relay/config.toml; hosts embedding the engine can also load from an
//! explicit path or construct a [`Config`] in code.
//!
//! # Configuration Sections
//!
//! - **core**: Data directory, log level
//! - **orchestrator**: Default model list, recovery and timeout knobs
//! - **memory**: Ring capacity, context item count, persistence toggle
//!
//! # Path Expansion
//!
//! The configuration system automatically expands `~` to the user's home
//! directory; the data directory itself is created lazily by whatever
//! first writes into it.

use sdk::errors::OrchestrationError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Orchestrator pipeline settings
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Memory system settings
    #[serde(default)]
    pub memory: MemoryConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Data directory path (supports ~ expansion)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Orchestrator pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Ordered list of model ids to try loading when the loaded pool is
    /// empty
    #[serde(default)]
    pub default_models: Vec<String>,

    /// Dispatch recovery actions when failures are recorded
    #[serde(default = "default_true")]
    pub auto_recovery: bool,

    /// Registered model id promoted to rank 0 for code tasks
    #[serde(default)]
    pub code_specialist: Option<String>,

    /// Per-call generation timeout in seconds; absent means no timeout
    #[serde(default)]
    pub generation_timeout_secs: Option<u64>,

    /// Maximum simultaneous outbound calls to remote providers
    #[serde(default = "default_remote_concurrency")]
    pub remote_concurrency: usize,

    /// How many ranked candidates the analyzer returns
    #[serde(default = "default_rank_limit")]
    pub rank_limit: usize,
}

/// Memory system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Capacity of the interaction ring buffers
    #[serde(default = "default_memory_capacity")]
    pub capacity: usize,

    /// How many items each context layer contributes
    #[serde(default = "default_context_items")]
    pub context_items: usize,

    /// Persist the global interaction ring to disk
    #[serde(default = "default_true")]
    pub persist: bool,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.relay")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_remote_concurrency() -> usize {
    3
}

fn default_rank_limit() -> usize {
    3
}

fn default_memory_capacity() -> usize {
    100
}

fn default_context_items() -> usize {
    5
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            default_models: Vec::new(),
            auto_recovery: true,
            code_specialist: None,
            generation_timeout_secs: None,
            remote_concurrency: default_remote_concurrency(),
            rank_limit: default_rank_limit(),
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_memory_capacity(),
            context_items: default_context_items(),
            persist: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            core: CoreConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            memory: MemoryConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.relay/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default
    /// configuration and saves it there.
    pub fn load_or_create() -> Result<Self, OrchestrationError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, OrchestrationError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            OrchestrationError::Config(format!("Failed to read config file: {}", e))
        })?;

        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| OrchestrationError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, OrchestrationError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                OrchestrationError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let mut config = Self::default();
        config.validate_and_process()?;

        let toml_string = toml::to_string_pretty(&config).map_err(|e| {
            OrchestrationError::Config(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, toml_string).map_err(|e| {
            OrchestrationError::Config(format!("Failed to write config file: {}", e))
        })?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.relay/config.toml)
    fn default_config_path() -> Result<PathBuf, OrchestrationError> {
        let home = dirs::home_dir().ok_or_else(|| {
            OrchestrationError::Config("Could not determine home directory".to_string())
        })?;

        Ok(home.join(".relay").join("config.toml"))
    }

    /// Expand paths and check value ranges
    fn validate_and_process(&mut self) -> Result<(), OrchestrationError> {
        self.core.data_dir = expand_tilde(&self.core.data_dir)?;

        if self.memory.capacity == 0 {
            return Err(OrchestrationError::Config(
                "memory.capacity must be at least 1".to_string(),
            ));
        }

        if self.orchestrator.remote_concurrency == 0 {
            return Err(OrchestrationError::Config(
                "orchestrator.remote_concurrency must be at least 1".to_string(),
            ));
        }

        if self.orchestrator.rank_limit == 0 {
            return Err(OrchestrationError::Config(
                "orchestrator.rank_limit must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Path of the interactions persistence file under the data directory
    pub fn interactions_path(&self) -> PathBuf {
        self.core.data_dir.join("interactions.json")
    }
}

/// Expand a leading `~` to the user's home directory
fn expand_tilde(path: &Path) -> Result<PathBuf, OrchestrationError> {
    let path_str = path.to_string_lossy();

    if let Some(stripped) = path_str.strip_prefix("~") {
        let home = dirs::home_dir().ok_or_else(|| {
            OrchestrationError::Config("Could not determine home directory".to_string())
        })?;
        let stripped = stripped.trim_start_matches('/');
        Ok(home.join(stripped))
    } else {
        Ok(path.to_path_buf())
    }
}
