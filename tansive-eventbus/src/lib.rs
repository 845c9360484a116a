//! In-process publish/subscribe event bus for interactive and audit event streams.
//!
//! Each subscription owns a bounded channel; a slow subscriber has its event dropped rather than
//! blocking the producer — audit correctness lives in the hash-chained log
//! (`tansive-hashlog`), not in this bus, so dropped events here never compromise it.

pub mod topic;

pub use topic::topic_matches;

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

/// An event delivered to a subscriber.
#[derive(Debug, Clone)]
pub struct Event {
    pub topic: String,
    pub data: Value,
}

struct Subscriber {
    pattern: String,
    sender: mpsc::Sender<Event>,
}

/// A live subscription. Dropping it does not unsubscribe automatically — call [`Subscription::unsubscribe`]
/// (or [`EventBus::close_topic`]) to remove it from the bus; this mirrors the explicit
/// `CloseTopic`/`CloseAllForPattern` API the bus exposes for session teardown.
pub struct Subscription {
    pub id: Uuid,
    pub pattern: String,
    pub receiver: mpsc::Receiver<Event>,
}

/// Default per-subscriber channel capacity.
pub const DEFAULT_CAPACITY: usize = 256;

/// In-process pub/sub bus. `topic → id → Subscriber`, guarded by a single RW lock; publish
/// iterates under a read lock and only blocks per-subscriber for at most the caller's timeout.
#[derive(Default)]
pub struct EventBus {
    subscribers: RwLock<HashMap<String, HashMap<Uuid, Subscriber>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self { subscribers: RwLock::new(HashMap::new()) }
    }

    /// Subscribe to `pattern` with the default channel capacity.
    pub fn subscribe(&self, pattern: impl Into<String>) -> Subscription {
        self.subscribe_with_capacity(pattern, DEFAULT_CAPACITY)
    }

    pub fn subscribe_with_capacity(&self, pattern: impl Into<String>, capacity: usize) -> Subscription {
        let pattern = pattern.into();
        let id = Uuid::new_v4();
        let (sender, receiver) = mpsc::channel(capacity.max(1));

        self.subscribers
            .write()
            .entry(pattern.clone())
            .or_default()
            .insert(id, Subscriber { pattern: pattern.clone(), sender });

        Subscription { id, pattern, receiver }
    }

    /// Publish `data` on `topic`. Subscribers whose pattern matches `topic` each get up to
    /// `timeout` to accept the send; a subscriber that doesn't accept in time has this event
    /// dropped, it is not disconnected.
    pub async fn publish(&self, topic: &str, data: Value, timeout: Duration) {
        let matching: Vec<mpsc::Sender<Event>> = {
            let subscribers = self.subscribers.read();
            subscribers
                .iter()
                .filter(|(pattern, _)| topic_matches(pattern, topic))
                .flat_map(|(_, by_id)| by_id.values().map(|s| s.sender.clone()))
                .collect()
        };

        for sender in matching {
            let event = Event { topic: topic.to_string(), data: data.clone() };
            match tokio::time::timeout(timeout, sender.send(event)).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => tracing::trace!(topic, "subscriber channel closed, dropping event"),
                Err(_) => tracing::debug!(topic, ?timeout, "subscriber too slow, dropping event"),
            }
        }
    }

    /// Remove and close the subscription registered with `id` under exact pattern `pattern`.
    pub fn unsubscribe(&self, pattern: &str, id: Uuid) {
        let mut subscribers = self.subscribers.write();
        if let Some(by_id) = subscribers.get_mut(pattern) {
            by_id.remove(&id);
            if by_id.is_empty() {
                subscribers.remove(pattern);
            }
        }
    }

    /// Close and remove every subscriber registered under the exact pattern `pattern`. Returns
    /// the number of subscribers closed.
    pub fn close_topic(&self, pattern: &str) -> usize {
        let mut subscribers = self.subscribers.write();
        subscribers.remove(pattern).map(|by_id| by_id.len()).unwrap_or(0)
    }

    /// Close and remove every subscriber whose *registered pattern* is matched by `query`
    /// (`query` is evaluated as a topic-matching pattern against each registered pattern string).
    /// Used for bulk teardown, e.g. a session closing every subscription under
    /// `session.<id>.*` regardless of the exact pattern each was registered with.
    pub fn close_all_for_pattern(&self, query: &str) -> usize {
        let mut subscribers = self.subscribers.write();
        let doomed: Vec<String> = subscribers.keys().filter(|p| topic_matches(query, p)).cloned().collect();
        let mut closed = 0;
        for pattern in doomed {
            if let Some(by_id) = subscribers.remove(&pattern) {
                closed += by_id.len();
            }
        }
        closed
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().values().map(|by_id| by_id.len()).sum()
    }
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn subscriber_receives_matching_topic() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe("session.s1.*");
        bus.publish("session.s1.log", json!({"line": "hi"}), Duration::from_millis(50)).await;

        let event = sub.receiver.recv().await.unwrap();
        assert_eq!(event.topic, "session.s1.log");
    }

    #[tokio::test]
    async fn non_matching_topic_is_not_delivered() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe("session.s1.*");
        bus.publish("session.s2.log", json!({}), Duration::from_millis(50)).await;

        let result = tokio::time::timeout(Duration::from_millis(50), sub.receiver.recv()).await;
        assert!(result.is_err(), "should not have received an event for a non-matching topic");
    }

    #[tokio::test]
    async fn close_topic_closes_exactly_matching_subscribers() {
        let bus = EventBus::new();
        let mut sub_a = bus.subscribe("session.s1.*");
        let mut sub_b = bus.subscribe("session.s2.*");

        let closed = bus.close_topic("session.s1.*");
        assert_eq!(closed, 1);

        assert!(sub_a.receiver.recv().await.is_none());

        bus.publish("session.s2.log", json!({}), Duration::from_millis(50)).await;
        assert!(sub_b.receiver.recv().await.is_some());
    }

    #[tokio::test]
    async fn close_all_for_pattern_closes_multiple_registrations() {
        let bus = EventBus::new();
        let mut sub_log = bus.subscribe("session.s1.log");
        let mut sub_audit = bus.subscribe("session.s1.audit");
        let mut sub_other = bus.subscribe("session.s2.log");

        let closed = bus.close_all_for_pattern("session.s1.*");
        assert_eq!(closed, 2);
        assert!(sub_log.receiver.recv().await.is_none());
        assert!(sub_audit.receiver.recv().await.is_none());

        bus.publish("session.s2.log", json!({}), Duration::from_millis(50)).await;
        assert!(sub_other.receiver.recv().await.is_some());
    }

    #[tokio::test]
    async fn publish_is_non_blocking_under_buffer_saturation() {
        let bus = EventBus::new();
        let sub = bus.subscribe_with_capacity("session.s1.*", 1);
        // never drained, so the channel fills up immediately.
        let start = std::time::Instant::now();
        for _ in 0..5 {
            bus.publish("session.s1.log", json!({}), Duration::from_millis(20)).await;
        }
        assert!(start.elapsed() < Duration::from_millis(200), "publish should drop rather than block");
        drop(sub);
    }
}
