//! Shared test doubles for the integration tests
#![allow(dead_code)] // not every test target uses every constructor

use async_trait::async_trait;
use sdk::backend::ModelBackend;
use sdk::errors::{OrchestrationError, Result};
use sdk::types::GenerationParams;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Scriptable in-memory backend
pub struct ScriptedBackend {
    loaded: AtomicBool,
    load_succeeds: bool,
    response: Option<String>,
    fail_generation: bool,
    /// Every prompt this backend was asked to generate for
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    /// Loaded backend always answering `response`
    pub fn fixed(response: impl Into<String>) -> Self {
        Self {
            loaded: AtomicBool::new(true),
            load_succeeds: true,
            response: Some(response.into()),
            fail_generation: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Loaded backend echoing `"echo:<prompt>"`
    pub fn echoing() -> Self {
        Self {
            response: None,
            ..Self::fixed("")
        }
    }

    /// Loaded backend failing every generation
    pub fn failing() -> Self {
        Self {
            fail_generation: true,
            ..Self::fixed("")
        }
    }

    /// Unloaded backend that loads on demand
    pub fn lazy(response: impl Into<String>) -> Self {
        Self {
            loaded: AtomicBool::new(false),
            ..Self::fixed(response)
        }
    }

    /// Unloaded backend whose load attempt fails
    pub fn unloadable() -> Self {
        Self {
            loaded: AtomicBool::new(false),
            load_succeeds: false,
            ..Self::fixed("")
        }
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    async fn load(&self) -> Result<()> {
        if self.load_succeeds {
            self.loaded.store(true, Ordering::SeqCst);
            Ok(())
        } else {
            Err(OrchestrationError::LoadFailed {
                model_id: "scripted".to_string(),
                reason: "load disabled".to_string(),
            })
        }
    }

    async fn generate(&self, prompt: &str, _params: &GenerationParams) -> Result<String> {
        self.prompts
            .lock()
            .expect("prompt log lock poisoned")
            .push(prompt.to_string());

        if self.fail_generation {
            return Err(OrchestrationError::InvalidResponse(
                "scripted failure".to_string(),
            ));
        }

        Ok(match &self.response {
            Some(fixed) => fixed.clone(),
            None => format!("echo:{prompt}"),
        })
    }
}
