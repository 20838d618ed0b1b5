//! Event bus for presentation-layer observation
//!
//! Components publish state changes here instead of broadcasting implicit
//! notifications; the (out-of-scope) presentation layer subscribes with a
//! plain channel. Bounded channels keep a slow or absent subscriber from
//! growing memory without bound — a full channel drops the event for that
//! subscriber.

use crate::diagnostics::HealthState;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Channel buffer size for bounded channels
const CHANNEL_BUFFER_SIZE: usize = 100;

/// Event types that can be published on the bus
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum EventType {
    /// A generation request entered the pipeline
    GenerationStarted,
    /// A generation request produced a response
    GenerationCompleted,
    /// A generation request exhausted every candidate
    GenerationFailed,
    /// A model's load state changed
    LoadStateChanged,
    /// The derived health state changed
    HealthChanged,
    /// A recovery action was dispatched
    RecoveryAttempted,
    /// Subscribe to all event types
    All,
}

/// Events published on the bus
#[derive(Debug, Clone)]
pub enum Event {
    /// Generation started for a request of the given category
    GenerationStarted { category: String },
    /// Generation completed on `model_id`
    GenerationCompleted { model_id: String },
    /// Generation failed after exhausting candidates
    GenerationFailed { error: String },
    /// Load state of `model_id` changed
    LoadStateChanged { model_id: String, loaded: bool },
    /// Health transitioned to `state`
    HealthChanged { state: HealthState },
    /// Recovery action attempted for `model_id`
    RecoveryAttempted { model_id: String, action: String },
}

impl Event {
    /// Get the event type for this event
    pub fn event_type(&self) -> EventType {
        match self {
            Event::GenerationStarted { .. } => EventType::GenerationStarted,
            Event::GenerationCompleted { .. } => EventType::GenerationCompleted,
            Event::GenerationFailed { .. } => EventType::GenerationFailed,
            Event::LoadStateChanged { .. } => EventType::LoadStateChanged,
            Event::HealthChanged { .. } => EventType::HealthChanged,
            Event::RecoveryAttempted { .. } => EventType::RecoveryAttempted,
        }
    }
}

/// Bounded pub/sub bus
///
/// Subscribers register for a specific event type or [`EventType::All`];
/// publishing sends to both groups. A subscriber whose channel is full or
/// closed misses the event silently.
pub struct EventBus {
    channels: Arc<Mutex<HashMap<EventType, Vec<mpsc::Sender<Event>>>>>,
}

impl EventBus {
    /// Create a new bus with no subscribers
    pub fn new() -> Self {
        Self {
            channels: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Subscribe to a specific event type (or all events)
    pub async fn subscribe(&self, event_type: EventType) -> mpsc::Receiver<Event> {
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let mut channels = self.channels.lock().await;
        channels.entry(event_type).or_default().push(tx);
        rx
    }

    /// Publish an event to all matching subscribers
    pub async fn publish(&self, event: Event) {
        let channels = self.channels.lock().await;
        let event_type = event.event_type();

        if let Some(subscribers) = channels.get(&event_type) {
            for tx in subscribers {
                // A dropped or saturated subscriber is not our problem
                let _ = tx.try_send(event.clone());
            }
        }

        if let Some(subscribers) = channels.get(&EventType::All) {
            for tx in subscribers {
                let _ = tx.try_send(event.clone());
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribe_and_publish() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe(EventType::GenerationCompleted).await;

        bus.publish(Event::GenerationCompleted {
            model_id: "phi-3".to_string(),
        })
        .await;

        match rx.recv().await.unwrap() {
            Event::GenerationCompleted { model_id } => assert_eq!(model_id, "phi-3"),
            other => panic!("wrong event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_all_subscription_sees_everything() {
        let bus = EventBus::new();
        let mut rx_all = bus.subscribe(EventType::All).await;

        bus.publish(Event::LoadStateChanged {
            model_id: "m".to_string(),
            loaded: true,
        })
        .await;
        bus.publish(Event::GenerationFailed {
            error: "exhausted".to_string(),
        })
        .await;

        assert!(matches!(
            rx_all.recv().await.unwrap(),
            Event::LoadStateChanged { .. }
        ));
        assert!(matches!(
            rx_all.recv().await.unwrap(),
            Event::GenerationFailed { .. }
        ));
    }

    #[tokio::test]
    async fn test_subscribers_filtered_by_type() {
        let bus = EventBus::new();
        let mut rx_started = bus.subscribe(EventType::GenerationStarted).await;
        let mut rx_completed = bus.subscribe(EventType::GenerationCompleted).await;

        bus.publish(Event::GenerationStarted {
            category: "code".to_string(),
        })
        .await;

        assert!(matches!(
            rx_started.recv().await.unwrap(),
            Event::GenerationStarted { .. }
        ));
        assert!(rx_completed.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_full_channel_drops_instead_of_blocking() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe(EventType::GenerationStarted).await;

        for _ in 0..CHANNEL_BUFFER_SIZE + 20 {
            bus.publish(Event::GenerationStarted {
                category: "general".to_string(),
            })
            .await;
        }

        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, CHANNEL_BUFFER_SIZE);
    }
}
