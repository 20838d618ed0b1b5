//! Self Diagnostics & Recovery
//!
//! Side-channel observer of execution outcomes. Each recorded event updates
//! the per-model metrics, appends to a bounded diagnostic ring, and
//! recomputes the derived health state from scratch — health is never
//! sticky. Recorded failures additionally dispatch a recovery action keyed
//! by error kind; reloading an unloaded model is the only recovery with a
//! real side effect, everything else is advisory.

use crate::events::{Event, EventBus};
use crate::registry::ModelRegistry;
use chrono::{DateTime, Utc};
use sdk::errors::OrchestrationError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{error, info, warn};

/// Capacity of the diagnostic event ring
pub const EVENT_CAPACITY: usize = 100;

/// Consecutive failures after which a model counts as critical
const CRITICAL_FAILURE_STREAK: u32 = 3;

/// Kind of a diagnostic event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    Info,
    Warning,
    Failure,
    Success,
}

/// One recorded observation, held in a bounded newest-first ring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticEvent {
    pub timestamp: DateTime<Utc>,
    pub model_id: Option<String>,
    pub kind: DiagnosticKind,
    pub message: String,
    pub detail: Option<String>,
}

/// Mutable per-model execution aggregate
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub total_executions: u64,
    pub successful_executions: u64,
    pub failed_executions: u64,
    pub total_execution_time: Duration,
    pub total_prompt_chars: u64,
    pub total_response_chars: u64,
    pub last_execution: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
}

impl ModelMetrics {
    /// Mean execution time, `None` before the first execution
    pub fn average_execution_time(&self) -> Option<Duration> {
        if self.total_executions == 0 {
            None
        } else {
            Some(self.total_execution_time / self.total_executions as u32)
        }
    }

    /// Fraction of executions that failed
    pub fn failure_rate(&self) -> f64 {
        if self.total_executions == 0 {
            0.0
        } else {
            self.failed_executions as f64 / self.total_executions as f64
        }
    }
}

/// Derived, non-persistent classification of backend reliability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthState {
    Normal,
    Degraded,
    Critical,
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthState::Normal => write!(f, "normal"),
            HealthState::Degraded => write!(f, "degraded"),
            HealthState::Critical => write!(f, "critical"),
        }
    }
}

/// Advisory severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// On-demand advisory computed from the current metrics
#[derive(Debug, Clone)]
pub struct Recommendation {
    pub severity: Severity,
    pub model_id: Option<String>,
    pub message: String,
}

struct DiagnosticState {
    metrics: HashMap<String, ModelMetrics>,
    events: VecDeque<DiagnosticEvent>,
    health: HealthState,
}

/// Metrics store, health monitor, and recovery dispatcher
pub struct SelfDiagnostics {
    state: Mutex<DiagnosticState>,
    registry: Arc<ModelRegistry>,
    bus: Arc<EventBus>,
    auto_recovery: bool,
}

impl SelfDiagnostics {
    /// Create diagnostics over `registry`, pre-populating metrics for every
    /// registered model id
    pub fn new(registry: Arc<ModelRegistry>, bus: Arc<EventBus>) -> Self {
        let metrics = registry
            .ids()
            .into_iter()
            .map(|id| (id, ModelMetrics::default()))
            .collect();

        Self {
            state: Mutex::new(DiagnosticState {
                metrics,
                events: VecDeque::new(),
                health: HealthState::Normal,
            }),
            registry,
            bus,
            auto_recovery: true,
        }
    }

    /// Enable or disable recovery dispatch on recorded failures
    pub fn with_auto_recovery(mut self, enabled: bool) -> Self {
        self.auto_recovery = enabled;
        self
    }

    /// Record a successful execution
    ///
    /// Resets the model's consecutive-failure counter and recomputes
    /// health.
    pub async fn record_success(
        &self,
        model_id: &str,
        elapsed: Duration,
        prompt_len: usize,
        response_len: usize,
    ) {
        let transition = {
            let mut state = self.state.lock().expect("diagnostics lock poisoned");

            let metrics = state.metrics.entry(model_id.to_string()).or_default();
            metrics.total_executions += 1;
            metrics.successful_executions += 1;
            metrics.total_execution_time += elapsed;
            metrics.total_prompt_chars += prompt_len as u64;
            metrics.total_response_chars += response_len as u64;
            metrics.last_execution = Some(Utc::now());
            metrics.consecutive_failures = 0;

            push_event(
                &mut state.events,
                DiagnosticEvent {
                    timestamp: Utc::now(),
                    model_id: Some(model_id.to_string()),
                    kind: DiagnosticKind::Success,
                    message: format!("generation completed in {:.2}s", elapsed.as_secs_f64()),
                    detail: None,
                },
            );

            refresh_health(&mut state)
        };

        self.publish_transition(transition).await;
    }

    /// Record a failed execution
    ///
    /// Increments the model's consecutive-failure counter, recomputes
    /// health, and (when auto-recovery is enabled) dispatches the recovery
    /// action for the error kind.
    pub async fn record_failure(&self, model_id: &str, failure: &OrchestrationError) {
        let transition = {
            let mut state = self.state.lock().expect("diagnostics lock poisoned");

            let metrics = state.metrics.entry(model_id.to_string()).or_default();
            metrics.total_executions += 1;
            metrics.failed_executions += 1;
            metrics.last_execution = Some(Utc::now());
            metrics.consecutive_failures += 1;

            push_event(
                &mut state.events,
                DiagnosticEvent {
                    timestamp: Utc::now(),
                    model_id: Some(model_id.to_string()),
                    kind: DiagnosticKind::Failure,
                    message: "generation failed".to_string(),
                    detail: Some(failure.to_string()),
                },
            );

            refresh_health(&mut state)
        };

        self.publish_transition(transition).await;

        if self.auto_recovery {
            self.dispatch_recovery(model_id, failure).await;
        }
    }

    /// Record a warning observation (no metric changes)
    pub fn record_warning(&self, model_id: Option<&str>, message: &str) {
        warn!(model_id = model_id.unwrap_or("-"), message);
        let mut state = self.state.lock().expect("diagnostics lock poisoned");
        push_event(
            &mut state.events,
            DiagnosticEvent {
                timestamp: Utc::now(),
                model_id: model_id.map(String::from),
                kind: DiagnosticKind::Warning,
                message: message.to_string(),
                detail: None,
            },
        );
    }

    /// Record an informational observation
    pub fn record_info(&self, model_id: Option<&str>, message: &str) {
        let mut state = self.state.lock().expect("diagnostics lock poisoned");
        push_event(
            &mut state.events,
            DiagnosticEvent {
                timestamp: Utc::now(),
                model_id: model_id.map(String::from),
                kind: DiagnosticKind::Info,
                message: message.to_string(),
                detail: None,
            },
        );
    }

    /// Snapshot of one model's metrics
    pub fn metrics(&self, model_id: &str) -> Option<ModelMetrics> {
        let state = self.state.lock().expect("diagnostics lock poisoned");
        state.metrics.get(model_id).cloned()
    }

    /// Snapshot of every model's metrics
    pub fn all_metrics(&self) -> HashMap<String, ModelMetrics> {
        let state = self.state.lock().expect("diagnostics lock poisoned");
        state.metrics.clone()
    }

    /// Zero every counter, keeping the known model ids
    pub fn reset_metrics(&self) {
        let mut state = self.state.lock().expect("diagnostics lock poisoned");
        for metrics in state.metrics.values_mut() {
            *metrics = ModelMetrics::default();
        }
        state.health = HealthState::Normal;
        info!("metrics reset");
    }

    /// Current derived health state
    pub fn health(&self) -> HealthState {
        self.state.lock().expect("diagnostics lock poisoned").health
    }

    /// Newest-first snapshot of the diagnostic event ring
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        let state = self.state.lock().expect("diagnostics lock poisoned");
        state.events.iter().cloned().collect()
    }

    /// Compute advisories from the current metrics snapshot
    ///
    /// Nothing is stored; each call scans fresh.
    pub fn recommendations(&self) -> Vec<Recommendation> {
        let state = self.state.lock().expect("diagnostics lock poisoned");
        let mut recommendations = Vec::new();

        for (model_id, metrics) in &state.metrics {
            let rate = metrics.failure_rate();

            if rate > 0.5 && metrics.total_executions >= 5 {
                recommendations.push(Recommendation {
                    severity: Severity::High,
                    model_id: Some(model_id.clone()),
                    message: format!(
                        "{} failed {:.0}% of {} runs; consider reloading or unregistering it",
                        model_id,
                        rate * 100.0,
                        metrics.total_executions
                    ),
                });
            } else if rate > 0.2 && metrics.total_executions >= 10 {
                recommendations.push(Recommendation {
                    severity: Severity::Medium,
                    model_id: Some(model_id.clone()),
                    message: format!(
                        "{} failed {:.0}% of {} runs; watch it",
                        model_id,
                        rate * 100.0,
                        metrics.total_executions
                    ),
                });
            }

            if let Some(average) = metrics.average_execution_time() {
                if average > Duration::from_secs(5) {
                    recommendations.push(Recommendation {
                        severity: Severity::Low,
                        model_id: Some(model_id.clone()),
                        message: format!(
                            "{} averages {:.1}s per generation; a smaller model may serve better",
                            model_id,
                            average.as_secs_f64()
                        ),
                    });
                }
            }
        }

        match state.health {
            HealthState::Critical => recommendations.push(Recommendation {
                severity: Severity::High,
                model_id: None,
                message: "multiple models are failing repeatedly; the pool is critical".to_string(),
            }),
            HealthState::Degraded => recommendations.push(Recommendation {
                severity: Severity::Medium,
                model_id: None,
                message: "backend health is degraded; check the failing model".to_string(),
            }),
            HealthState::Normal => {}
        }

        recommendations.sort_by_key(|r| std::cmp::Reverse(r.severity));
        recommendations
    }

    /// Publish a health transition, if one happened
    async fn publish_transition(&self, transition: Option<HealthState>) {
        if let Some(state) = transition {
            info!(health = %state, "health state changed");
            self.bus.publish(Event::HealthChanged { state }).await;
        }
    }

    /// Recovery dispatch keyed by error kind
    async fn dispatch_recovery(&self, model_id: &str, failure: &OrchestrationError) {
        match failure {
            OrchestrationError::ModelNotLoaded(_) => {
                // The one recovery with a real side effect
                match self.registry.handle(model_id) {
                    Some(handle) => match handle.load().await {
                        Ok(()) if handle.is_loaded() => {
                            self.registry.set_load_state(model_id, true);
                            info!(model_id, "recovery: model reloaded");
                            self.record_info(Some(model_id), "model reloaded after failure");
                            self.bus
                                .publish(Event::RecoveryAttempted {
                                    model_id: model_id.to_string(),
                                    action: "reload".to_string(),
                                })
                                .await;
                        }
                        _ => {
                            warn!(model_id, "recovery: reload attempt failed");
                            self.record_warning(Some(model_id), "reload attempt failed");
                        }
                    },
                    None => {
                        warn!(model_id, "recovery: model not in registry; cannot reload");
                    }
                }
            }
            OrchestrationError::ModelGenerationFailed { .. }
            | OrchestrationError::Timeout { .. } => {
                info!(model_id, "recovery advisory: retry with adjusted parameters");
                self.record_info(
                    Some(model_id),
                    "retry with adjusted parameters may succeed",
                );
                self.bus
                    .publish(Event::RecoveryAttempted {
                        model_id: model_id.to_string(),
                        action: "advise-retry".to_string(),
                    })
                    .await;
            }
            OrchestrationError::NoSuitableModel(_) => {
                info!(model_id, "recovery advisory: switch to a fallback model");
                self.record_info(Some(model_id), "switch to a fallback model");
                self.bus
                    .publish(Event::RecoveryAttempted {
                        model_id: model_id.to_string(),
                        action: "advise-fallback".to_string(),
                    })
                    .await;
            }
            other => {
                error!(model_id, error = %other, "unrecovered failure");
                self.record_warning(Some(model_id), &format!("unrecovered failure: {}", other));
                self.bus
                    .publish(Event::RecoveryAttempted {
                        model_id: model_id.to_string(),
                        action: "notify".to_string(),
                    })
                    .await;
            }
        }
    }
}

/// Append to the ring, evicting the oldest entry past capacity
fn push_event(events: &mut VecDeque<DiagnosticEvent>, event: DiagnosticEvent) {
    events.push_front(event);
    events.truncate(EVENT_CAPACITY);
}

/// Recompute health from the metrics; returns the new state when it changed
fn refresh_health(state: &mut DiagnosticState) -> Option<HealthState> {
    let critical_models = state
        .metrics
        .values()
        .filter(|m| m.consecutive_failures >= CRITICAL_FAILURE_STREAK)
        .count();

    let total_executions: u64 = state.metrics.values().map(|m| m.total_executions).sum();
    let total_failures: u64 = state.metrics.values().map(|m| m.failed_executions).sum();

    let health = if critical_models >= 2 {
        HealthState::Critical
    } else if critical_models == 1 {
        HealthState::Degraded
    } else if total_executions > 10
        && total_failures as f64 / total_executions as f64 > 0.3
    {
        HealthState::Degraded
    } else {
        HealthState::Normal
    };

    if health != state.health {
        state.health = health;
        Some(health)
    } else {
        None
    }
}
