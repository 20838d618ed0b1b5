//! Memory Context Manager
//!
//! Keeps a bounded history of successful interactions — one global ring and
//! one ring per model id, newest first — and assembles context-aware prompts
//! from three layers: vector-memory snippets, external knowledge, and the
//! target model's recent history. The global ring is persisted best-effort
//! to a single JSON file; a failed write never fails the interaction that
//! triggered it.
//!
//! Retrieval collaborators are optional and injected at construction; an
//! absent collaborator simply contributes no layer.

use chrono::{DateTime, Utc};
use sdk::backend::{KnowledgeSource, VectorMemory};
use sdk::errors::{OrchestrationError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};
use uuid::Uuid;

/// Default capacity of the interaction ring buffers
pub const DEFAULT_CAPACITY: usize = 100;

/// One completed prompt/response exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    /// Unique id
    pub id: Uuid,

    /// The prompt as sent to the backend
    pub prompt: String,

    /// The generated response
    pub response: String,

    /// Every model that contributed to the response
    pub model_ids: Vec<String>,

    /// When the interaction completed (serialized as ISO-8601)
    pub timestamp: DateTime<Utc>,
}

#[derive(Default)]
struct MemoryState {
    /// Newest-first global ring
    global: VecDeque<Interaction>,

    /// Newest-first ring per model id
    per_model: HashMap<String, VecDeque<Interaction>>,
}

/// History store and prompt augmenter
pub struct MemoryContextManager {
    state: Mutex<MemoryState>,
    capacity: usize,
    vector_memory: Option<Arc<dyn VectorMemory>>,
    knowledge: Option<Arc<dyn KnowledgeSource>>,
    persist_path: Option<PathBuf>,
}

impl MemoryContextManager {
    /// Create a manager with ring capacity `capacity`, no collaborators,
    /// and no persistence
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            capacity: capacity.max(1),
            vector_memory: None,
            knowledge: None,
            persist_path: None,
        }
    }

    /// Attach a vector-memory collaborator
    pub fn with_vector_memory(mut self, collaborator: Option<Arc<dyn VectorMemory>>) -> Self {
        self.vector_memory = collaborator;
        self
    }

    /// Attach an external-knowledge collaborator
    pub fn with_knowledge_source(mut self, collaborator: Option<Arc<dyn KnowledgeSource>>) -> Self {
        self.knowledge = collaborator;
        self
    }

    /// Persist the global ring to `path` after every stored interaction
    pub fn with_persistence(mut self, path: PathBuf) -> Self {
        self.persist_path = Some(path);
        self
    }

    /// Record a successful interaction in both rings
    ///
    /// When persistence is configured, a snapshot of the global ring is
    /// written in a background task; write failures are logged and
    /// swallowed.
    pub fn store_interaction(
        &self,
        prompt: &str,
        response: &str,
        model_ids: &[String],
    ) -> Interaction {
        let interaction = Interaction {
            id: Uuid::new_v4(),
            prompt: prompt.to_string(),
            response: response.to_string(),
            model_ids: model_ids.to_vec(),
            timestamp: Utc::now(),
        };

        let snapshot: Option<Vec<Interaction>> = {
            let mut state = self.state.lock().expect("memory lock poisoned");

            state.global.push_front(interaction.clone());
            state.global.truncate(self.capacity);

            for model_id in model_ids {
                let ring = state.per_model.entry(model_id.clone()).or_default();
                ring.push_front(interaction.clone());
                ring.truncate(self.capacity);
            }

            self.persist_path
                .as_ref()
                .map(|_| state.global.iter().cloned().collect())
        };

        if let (Some(path), Some(items)) = (self.persist_path.clone(), snapshot) {
            tokio::spawn(async move {
                if let Err(e) = write_interactions(&path, &items).await {
                    warn!(error = %e, path = %path.display(), "interaction persist failed");
                }
            });
        }

        interaction
    }

    /// Build a composite prompt from the configured context layers
    ///
    /// Layer order is fixed: vector-memory snippets, then external
    /// knowledge, then the last `max_items` exchanges recorded for
    /// `model_id`. Layers that produce nothing are skipped; with no layers
    /// the raw prompt comes back unchanged.
    pub async fn generate_context_aware_prompt(
        &self,
        prompt: &str,
        model_id: &str,
        max_items: usize,
    ) -> String {
        let mut sections: Vec<String> = Vec::new();

        if let Some(vector) = &self.vector_memory {
            let snippets = vector.search_similar(prompt, max_items).await;
            if !snippets.is_empty() {
                let mut section = String::from("Relevant information from memory:\n");
                for snippet in snippets {
                    section.push_str(&format!("- {}\n", snippet.content));
                }
                sections.push(section);
            }
        }

        if let Some(knowledge) = &self.knowledge {
            let items = knowledge.relevant_items(prompt, max_items).await;
            if !items.is_empty() {
                let mut section = String::from("Relevant external information:\n");
                for item in items {
                    section.push_str(&format!("- {}\n", item));
                }
                sections.push(section);
            }
        }

        let history = self.recent_for_model(model_id, max_items);
        if !history.is_empty() {
            let mut section = String::from("Previous interactions:\n");
            // The ring is newest-first; present oldest-first so the
            // conversation reads forward
            for interaction in history.iter().rev() {
                section.push_str(&format!(
                    "User: {}\nAssistant: {}\n",
                    interaction.prompt, interaction.response
                ));
            }
            sections.push(section);
        }

        if sections.is_empty() {
            return prompt.to_string();
        }

        debug!(layers = sections.len(), "context-aware prompt assembled");
        format!("{}\n{}", sections.join("\n"), prompt)
    }

    /// Case-insensitive substring search over prompt and response
    pub fn search_interactions(&self, query: &str) -> Vec<Interaction> {
        let needle = query.to_lowercase();
        let state = self.state.lock().expect("memory lock poisoned");
        state
            .global
            .iter()
            .filter(|i| {
                i.prompt.to_lowercase().contains(&needle)
                    || i.response.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }

    /// Newest `limit` interactions from the global ring
    pub fn recent(&self, limit: usize) -> Vec<Interaction> {
        let state = self.state.lock().expect("memory lock poisoned");
        state.global.iter().take(limit).cloned().collect()
    }

    /// Newest `limit` interactions recorded for `model_id`
    pub fn recent_for_model(&self, model_id: &str, limit: usize) -> Vec<Interaction> {
        let state = self.state.lock().expect("memory lock poisoned");
        state
            .per_model
            .get(model_id)
            .map(|ring| ring.iter().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    /// Number of interactions in the global ring
    pub fn len(&self) -> usize {
        self.state.lock().expect("memory lock poisoned").global.len()
    }

    /// Whether the global ring is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the global ring to `path` as JSON (temp file, then atomic
    /// rename); returns how many interactions were written
    pub async fn export_interactions(&self, path: &Path) -> Result<usize> {
        let snapshot: Vec<Interaction> = {
            let state = self.state.lock().expect("memory lock poisoned");
            state.global.iter().cloned().collect()
        };

        write_interactions(path, &snapshot).await?;
        Ok(snapshot.len())
    }

    /// Replace the rings with the contents of a previously exported file;
    /// returns how many interactions were loaded
    pub async fn import_interactions(&self, path: &Path) -> Result<usize> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| OrchestrationError::Persistence(format!("read failed: {}", e)))?;

        let mut interactions: Vec<Interaction> = serde_json::from_str(&contents)
            .map_err(|e| OrchestrationError::Persistence(format!("parse failed: {}", e)))?;

        interactions.truncate(self.capacity);
        let count = interactions.len();

        let mut state = self.state.lock().expect("memory lock poisoned");
        state.global = interactions.iter().cloned().collect();

        // Rebuild the per-model rings; the file order is newest-first, so a
        // forward scan with push_back preserves it
        state.per_model.clear();
        for interaction in &interactions {
            for model_id in &interaction.model_ids {
                let ring = state.per_model.entry(model_id.clone()).or_default();
                if ring.len() < self.capacity {
                    ring.push_back(interaction.clone());
                }
            }
        }

        Ok(count)
    }

    /// Restore the global ring from the configured persistence file, if it
    /// exists; returns how many interactions were restored
    pub async fn load_persisted(&self) -> Result<usize> {
        match &self.persist_path {
            Some(path) if path.exists() => self.import_interactions(path).await,
            _ => Ok(0),
        }
    }
}

/// Serialize `items` to `path` via write-temp-then-atomic-rename
async fn write_interactions(path: &Path, items: &[Interaction]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| OrchestrationError::Persistence(format!("mkdir failed: {}", e)))?;
    }

    let json = serde_json::to_vec_pretty(items)
        .map_err(|e| OrchestrationError::Persistence(format!("serialize failed: {}", e)))?;

    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json)
        .await
        .map_err(|e| OrchestrationError::Persistence(format!("write failed: {}", e)))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| OrchestrationError::Persistence(format!("rename failed: {}", e)))?;

    Ok(())
}
