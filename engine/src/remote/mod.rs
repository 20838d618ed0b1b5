//! Remote provider dispatch
//!
//! Wraps the host's [`RemoteExecutor`] with the engine's one explicit
//! backpressure point: a semaphore capping simultaneous outbound provider
//! calls (3 by default). Every remote execution in the engine flows through
//! [`RemoteDispatcher::execute`]; nothing else talks to the executor
//! directly.

use sdk::backend::RemoteExecutor;
use sdk::errors::{OrchestrationError, Result};
use sdk::types::RequestContext;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;

/// Default cap on simultaneous outbound provider calls
pub const DEFAULT_REMOTE_CONCURRENCY: usize = 3;

/// A remote model addressed as (provider, model id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTarget {
    /// Provider-side model identifier
    pub model_id: String,

    /// Provider name (e.g. "openai", "anthropic")
    pub provider: String,
}

impl RemoteTarget {
    pub fn new(model_id: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            provider: provider.into(),
        }
    }

    /// Source label used when tagging combined outputs
    pub fn label(&self) -> String {
        format!("{}/{}", self.provider, self.model_id)
    }
}

impl fmt::Display for RemoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.model_id)
    }
}

/// Bounded-concurrency gateway to remote providers
pub struct RemoteDispatcher {
    executor: Arc<dyn RemoteExecutor>,
    permits: Arc<Semaphore>,
}

impl RemoteDispatcher {
    /// Wrap `executor` with a cap of `max_concurrent` in-flight calls
    pub fn new(executor: Arc<dyn RemoteExecutor>, max_concurrent: usize) -> Self {
        Self {
            executor,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Wrap `executor` with the default cap
    pub fn with_default_limit(executor: Arc<dyn RemoteExecutor>) -> Self {
        Self::new(executor, DEFAULT_REMOTE_CONCURRENCY)
    }

    /// Execute `context` against `target`, waiting for a permit when the
    /// cap is reached
    pub async fn execute(&self, context: &RequestContext, target: &RemoteTarget) -> Result<String> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| OrchestrationError::ExecutorUnavailable)?;

        debug!(target = %target, "dispatching remote call");
        self.executor
            .execute_remote(context, &target.model_id, &target.provider)
            .await
    }

    /// Permits currently free (test and introspection hook)
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}
