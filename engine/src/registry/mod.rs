//! Model Registry
//!
//! Catalog of every backend the engine can route to. Each entry pairs a
//! [`ModelDescriptor`] (identity, capabilities, priority, load state) with
//! the host-provided [`ModelBackend`] handle. The registry is the single
//! owner of descriptors: other components read snapshots and request
//! load-state changes, they never hold mutable references.
//!
//! All listings are sorted ascending by priority (lower = preferred) with
//! registration order breaking ties, so every consumer sees the same
//! deterministic candidate order.

use sdk::backend::ModelBackend;
use sdk::types::{ReasoningTier, TaskCategory};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// What a backend can do
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCapabilities {
    /// Task categories this backend supports
    pub categories: BTreeSet<TaskCategory>,

    /// Coarse reasoning rank
    pub reasoning_tier: ReasoningTier,

    /// Context window in tokens
    pub context_window: usize,

    /// True when the backend never leaves the machine
    pub local_only: bool,
}

impl ModelCapabilities {
    /// Build capabilities from a category list
    pub fn new(
        categories: &[TaskCategory],
        reasoning_tier: ReasoningTier,
        context_window: usize,
        local_only: bool,
    ) -> Self {
        Self {
            categories: categories.iter().copied().collect(),
            reasoning_tier,
            context_window,
            local_only,
        }
    }

    /// Whether `category` is in the supported set
    pub fn supports(&self, category: TaskCategory) -> bool {
        self.categories.contains(&category)
    }
}

/// Identity and routing metadata for one backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Unique id the backend is registered under
    pub id: String,

    /// Human-readable name for the presentation layer
    pub display_name: String,

    /// Capability set
    pub capabilities: ModelCapabilities,

    /// Selection priority; lower is preferred
    pub priority: i32,

    /// Whether the backend is currently loaded
    pub loaded: bool,
}

impl ModelDescriptor {
    /// Create a descriptor in the unloaded state
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        capabilities: ModelCapabilities,
        priority: i32,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            capabilities,
            priority,
            loaded: false,
        }
    }
}

struct RegistryEntry {
    descriptor: ModelDescriptor,
    handle: Arc<dyn ModelBackend>,
    /// Registration sequence number, breaks priority ties
    seq: u64,
}

#[derive(Default)]
struct RegistryInner {
    entries: HashMap<String, RegistryEntry>,
    next_seq: u64,
}

/// Thread-safe backend catalog
///
/// A single `RwLock` serializes all writes; read operations return cloned
/// snapshots so callers never observe a half-applied mutation.
#[derive(Default)]
pub struct ModelRegistry {
    inner: RwLock<RegistryInner>,
}

impl ModelRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend under its descriptor id
    ///
    /// Registering an id that already exists is a no-op: the existing entry
    /// is left untouched and a warning is logged. Use
    /// [`ModelRegistry::reregister`] to replace an entry deliberately.
    /// Returns whether the entry was inserted.
    pub fn register(&self, descriptor: ModelDescriptor, handle: Arc<dyn ModelBackend>) -> bool {
        let mut inner = self.inner.write().expect("registry lock poisoned");

        if inner.entries.contains_key(&descriptor.id) {
            warn!(
                model_id = %descriptor.id,
                "duplicate registration ignored; entry unchanged"
            );
            return false;
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        debug!(model_id = %descriptor.id, priority = descriptor.priority, "model registered");
        inner.entries.insert(
            descriptor.id.clone(),
            RegistryEntry {
                descriptor,
                handle,
                seq,
            },
        );
        true
    }

    /// Replace (or insert) the entry for `descriptor.id`
    ///
    /// An existing entry keeps its registration order, so re-registering a
    /// model does not move it behind later registrations at equal priority.
    pub fn reregister(&self, descriptor: ModelDescriptor, handle: Arc<dyn ModelBackend>) {
        let mut inner = self.inner.write().expect("registry lock poisoned");

        let seq = match inner.entries.get(&descriptor.id) {
            Some(existing) => existing.seq,
            None => {
                let seq = inner.next_seq;
                inner.next_seq += 1;
                seq
            }
        };

        debug!(model_id = %descriptor.id, "model re-registered");
        inner.entries.insert(
            descriptor.id.clone(),
            RegistryEntry {
                descriptor,
                handle,
                seq,
            },
        );
    }

    /// Remove an entry; returns whether it existed
    pub fn unregister(&self, id: &str) -> bool {
        let mut inner = self.inner.write().expect("registry lock poisoned");
        let removed = inner.entries.remove(id).is_some();
        if removed {
            debug!(model_id = %id, "model unregistered");
        }
        removed
    }

    /// Snapshot of one descriptor
    pub fn get(&self, id: &str) -> Option<ModelDescriptor> {
        let inner = self.inner.read().expect("registry lock poisoned");
        inner.entries.get(id).map(|e| e.descriptor.clone())
    }

    /// Backend handle for `id`
    pub fn handle(&self, id: &str) -> Option<Arc<dyn ModelBackend>> {
        let inner = self.inner.read().expect("registry lock poisoned");
        inner.entries.get(id).map(|e| Arc::clone(&e.handle))
    }

    /// All descriptors, ascending priority, registration order on ties
    pub fn list_all(&self) -> Vec<ModelDescriptor> {
        let inner = self.inner.read().expect("registry lock poisoned");
        let mut entries: Vec<(&RegistryEntry, u64)> =
            inner.entries.values().map(|e| (e, e.seq)).collect();
        entries.sort_by_key(|(e, seq)| (e.descriptor.priority, *seq));
        entries
            .into_iter()
            .map(|(e, _)| e.descriptor.clone())
            .collect()
    }

    /// Loaded descriptors only, same ordering as [`ModelRegistry::list_all`]
    pub fn list_loaded(&self) -> Vec<ModelDescriptor> {
        self.list_all().into_iter().filter(|d| d.loaded).collect()
    }

    /// Descriptors supporting `category`, same ordering
    pub fn list_for_category(&self, category: TaskCategory) -> Vec<ModelDescriptor> {
        self.list_all()
            .into_iter()
            .filter(|d| d.capabilities.supports(category))
            .collect()
    }

    /// Toggle the load flag; returns false when `id` is unknown
    pub fn set_load_state(&self, id: &str, loaded: bool) -> bool {
        let mut inner = self.inner.write().expect("registry lock poisoned");
        match inner.entries.get_mut(id) {
            Some(entry) => {
                entry.descriptor.loaded = loaded;
                debug!(model_id = %id, loaded, "load state changed");
                true
            }
            None => false,
        }
    }

    /// Number of registered models
    pub fn len(&self) -> usize {
        self.inner.read().expect("registry lock poisoned").entries.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All registered ids, in listing order
    pub fn ids(&self) -> Vec<String> {
        self.list_all().into_iter().map(|d| d.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sdk::errors::Result;
    use sdk::types::GenerationParams;

    struct NullBackend;

    #[async_trait]
    impl ModelBackend for NullBackend {
        fn is_loaded(&self) -> bool {
            true
        }

        async fn load(&self) -> Result<()> {
            Ok(())
        }

        async fn generate(&self, _prompt: &str, _params: &GenerationParams) -> Result<String> {
            Ok(String::new())
        }
    }

    fn descriptor(id: &str, priority: i32) -> ModelDescriptor {
        ModelDescriptor::new(
            id,
            id.to_uppercase(),
            ModelCapabilities::new(
                &[TaskCategory::General, TaskCategory::Code],
                ReasoningTier::Medium,
                8192,
                true,
            ),
            priority,
        )
    }

    fn registry_with(ids: &[(&str, i32)]) -> ModelRegistry {
        let registry = ModelRegistry::new();
        for (id, priority) in ids {
            registry.register(descriptor(id, *priority), Arc::new(NullBackend));
        }
        registry
    }

    #[test]
    fn test_list_all_sorted_by_priority() {
        let registry = registry_with(&[("c", 30), ("a", 10), ("b", 20)]);
        let ids: Vec<String> = registry.list_all().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_equal_priority_keeps_registration_order() {
        let registry = registry_with(&[("first", 5), ("second", 5), ("third", 5)]);
        let ids: Vec<String> = registry.list_all().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_duplicate_registration_is_noop() {
        let registry = registry_with(&[("m", 10)]);

        let mut replacement = descriptor("m", 99);
        replacement.display_name = "REPLACED".to_string();
        let inserted = registry.register(replacement, Arc::new(NullBackend));

        assert!(!inserted);
        let kept = registry.get("m").unwrap();
        assert_eq!(kept.priority, 10);
        assert_eq!(kept.display_name, "M");
    }

    #[test]
    fn test_reregister_replaces() {
        let registry = registry_with(&[("m", 10)]);

        registry.reregister(descriptor("m", 99), Arc::new(NullBackend));
        assert_eq!(registry.get("m").unwrap().priority, 99);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_get_unknown_is_none() {
        let registry = registry_with(&[]);
        assert!(registry.get("ghost").is_none());
        assert!(registry.handle("ghost").is_none());
        assert!(!registry.set_load_state("ghost", true));
    }

    #[test]
    fn test_unregister() {
        let registry = registry_with(&[("m", 1)]);
        assert!(registry.unregister("m"));
        assert!(!registry.unregister("m"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_list_loaded_filters() {
        let registry = registry_with(&[("a", 1), ("b", 2)]);
        assert!(registry.list_loaded().is_empty());

        registry.set_load_state("b", true);
        let loaded: Vec<String> = registry.list_loaded().into_iter().map(|d| d.id).collect();
        assert_eq!(loaded, vec!["b"]);
    }

    #[test]
    fn test_list_for_category() {
        let registry = ModelRegistry::new();
        registry.register(
            ModelDescriptor::new(
                "coder",
                "Coder",
                ModelCapabilities::new(&[TaskCategory::Code], ReasoningTier::High, 16384, true),
                1,
            ),
            Arc::new(NullBackend),
        );
        registry.register(
            ModelDescriptor::new(
                "chatty",
                "Chatty",
                ModelCapabilities::new(&[TaskCategory::General], ReasoningTier::Low, 4096, true),
                2,
            ),
            Arc::new(NullBackend),
        );

        let code: Vec<String> = registry
            .list_for_category(TaskCategory::Code)
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(code, vec!["coder"]);

        let general: Vec<String> = registry
            .list_for_category(TaskCategory::General)
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(general, vec!["chatty"]);
    }
}
