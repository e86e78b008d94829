//! Integration events: what the layer did, published to subscribers and
//! kept in memory for the dashboard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationEventType {
    CrossPillarCommunication,
    UnifiedMonitoring,
    IntegrationValidation,
    CoordinationEvent,
}

impl IntegrationEventType {
    pub const ALL: [IntegrationEventType; 4] = [
        Self::CrossPillarCommunication,
        Self::UnifiedMonitoring,
        Self::IntegrationValidation,
        Self::CoordinationEvent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CrossPillarCommunication => "cross_pillar_communication",
            Self::UnifiedMonitoring => "unified_monitoring",
            Self::IntegrationValidation => "integration_validation",
            Self::CoordinationEvent => "coordination_event",
        }
    }
}

impl fmt::Display for IntegrationEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationEvent {
    pub event_type: IntegrationEventType,
    pub description: String,
    pub details: Value,
    pub timestamp: DateTime<Utc>,
}

impl IntegrationEvent {
    pub fn new(event_type: IntegrationEventType, description: impl Into<String>, details: Value) -> Self {
        Self {
            event_type,
            description: description.into(),
            details,
            timestamp: Utc::now(),
        }
    }
}

/// Broadcast fan-out for [`IntegrationEvent`]s.
///
/// Subscribers that fall behind lose the oldest events.
pub struct EventBus {
    sender: broadcast::Sender<Arc<IntegrationEvent>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: IntegrationEvent) {
        // No subscribers is not an error.
        let _ = self.sender.send(Arc::new(event));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<IntegrationEvent>> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        bus.publish(IntegrationEvent::new(
            IntegrationEventType::CoordinationEvent,
            "Synergy activation triggered for context: technical",
            json!({ "context": "technical" }),
        ));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type, IntegrationEventType::CoordinationEvent);
        assert_eq!(event.details["context"], "technical");
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let bus = EventBus::default();
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish(IntegrationEvent::new(
            IntegrationEventType::UnifiedMonitoring,
            "report",
            Value::Null,
        ));
    }

    #[test]
    fn event_type_serializes_snake_case() {
        let value = serde_json::to_value(IntegrationEventType::CrossPillarCommunication).unwrap();
        assert_eq!(value, "cross_pillar_communication");
    }
}
