//! Typed notification events and the per-user push hub.
//!
//! Events are a closed tagged enum so that adding a new event type is a
//! compile-time-checked change at every match site, rather than a
//! string-keyed dispatch table.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use scout_protocol::ResearchFinding;

/// Everything the channel can carry, tagged on the wire by `type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    ConnectionEstablished {
        user_id: String,
    },
    /// Liveness probe; carries no payload.
    Heartbeat,
    NewResearch {
        finding: ResearchFinding,
    },
    ResearchComplete {
        topic_id: String,
        topic_name: String,
        quality_score: f64,
    },
    SystemStatus {
        running: bool,
        impetus: f64,
        active_topics: usize,
    },
}

impl NotificationEvent {
    /// Wire tag for logging and subscription filtering.
    pub fn kind(&self) -> &'static str {
        match self {
            NotificationEvent::ConnectionEstablished { .. } => "connection_established",
            NotificationEvent::Heartbeat => "heartbeat",
            NotificationEvent::NewResearch { .. } => "new_research",
            NotificationEvent::ResearchComplete { .. } => "research_complete",
            NotificationEvent::SystemStatus { .. } => "system_status",
        }
    }
}

/// Delivery envelope (RFC3339 time). The `id` is what clients deduplicate on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub id: String,
    pub time: String,
    #[serde(flatten)]
    pub event: NotificationEvent,
}

impl Envelope {
    pub fn new(event: NotificationEvent) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            time: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            event,
        }
    }
}

/// Per-user broadcast hub.
///
/// Delivery is best-effort while connected: publishing to a user with no
/// live subscriber drops the event, and clients reconcile by fetching state
/// on reconnect. Within one user's channel, events are delivered in publish
/// order.
pub struct NotifyHub {
    capacity: usize,
    channels: Mutex<HashMap<String, broadcast::Sender<Envelope>>>,
}

impl NotifyHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe a client to a user's channel, creating it on first use.
    pub fn subscribe(&self, user_id: &str) -> broadcast::Receiver<Envelope> {
        let mut guard = self.channels.lock().expect("notify hub poisoned");
        guard
            .entry(user_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Publish an event to a user's channel. Returns `true` when at least one
    /// subscriber received it.
    pub fn publish(&self, user_id: &str, event: NotificationEvent) -> bool {
        let envelope = Envelope::new(event);
        let mut guard = self.channels.lock().expect("notify hub poisoned");
        match guard.get(user_id) {
            Some(tx) if tx.receiver_count() > 0 => tx.send(envelope).is_ok(),
            Some(_) => {
                // Last subscriber is gone; reclaim the slot.
                guard.remove(user_id);
                false
            }
            None => false,
        }
    }

    /// Number of live subscribers for a user.
    pub fn subscriber_count(&self, user_id: &str) -> usize {
        let guard = self.channels.lock().expect("notify hub poisoned");
        guard
            .get(user_id)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new(128)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_in_publish_order() {
        let hub = NotifyHub::new(16);
        let mut rx = hub.subscribe("alice");
        for i in 0..3usize {
            let delivered = hub.publish(
                "alice",
                NotificationEvent::SystemStatus {
                    running: true,
                    impetus: i as f64,
                    active_topics: i,
                },
            );
            assert!(delivered);
        }
        for i in 0..3usize {
            let env = rx.recv().await.unwrap();
            match env.event {
                NotificationEvent::SystemStatus { active_topics, .. } => {
                    assert_eq!(active_topics, i)
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn publish_without_subscriber_is_dropped() {
        let hub = NotifyHub::new(16);
        assert!(!hub.publish("nobody", NotificationEvent::Heartbeat));
        // Subscribing later must not replay the dropped event.
        let mut rx = hub.subscribe("nobody");
        assert!(hub.publish("nobody", NotificationEvent::Heartbeat));
        let env = rx.recv().await.unwrap();
        assert_eq!(env.event, NotificationEvent::Heartbeat);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn channels_are_isolated_per_user() {
        let hub = NotifyHub::new(16);
        let mut alice = hub.subscribe("alice");
        let _bob = hub.subscribe("bob");
        hub.publish(
            "bob",
            NotificationEvent::ConnectionEstablished {
                user_id: "bob".into(),
            },
        );
        assert!(alice.try_recv().is_err());
    }

    #[test]
    fn events_compare_by_value() {
        let finding = ResearchFinding {
            finding_id: "f1".into(),
            topic_id: "t1".into(),
            topic_name: "caches".into(),
            quality_score: 0.6,
            research_time: "2026-01-01T00:00:00.000Z".into(),
            read: false,
            bookmarked: false,
            integrated: false,
            content: serde_json::json!({"summary": "stub"}),
        };
        let a = NotificationEvent::NewResearch {
            finding: finding.clone(),
        };
        let b = NotificationEvent::NewResearch { finding };
        assert_eq!(a, b);
        assert_ne!(a, NotificationEvent::Heartbeat);
    }

    #[test]
    fn wire_tag_round_trip() {
        let event = NotificationEvent::Heartbeat;
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "heartbeat");
        let back: NotificationEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back.kind(), "heartbeat");
    }
}
