//! Process-wide fan-out of call arrival events.
//!
//! The broadcaster is an explicit, injectable registry: it is constructed
//! once per server process and handed to both the ingest handlers and the
//! socket endpoint. Each subscriber owns an independent unbounded queue, so
//! publishing never blocks on a slow consumer and delivery order within one
//! subscriber always matches publish order. Nothing is persisted: a
//! subscriber that is not registered at publish time never sees that event.

use std::collections::HashSet;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, trace};
use uuid::Uuid;

use callpop_call_events::CallArrivalEvent;

/// Opaque identifier for one live subscriber connection.
pub type ConnectionId = Uuid;

struct Subscriber {
    tx: mpsc::UnboundedSender<CallArrivalEvent>,
    groups: HashSet<String>,
}

/// In-memory publish hub for [`CallArrivalEvent`]s.
///
/// Safe under concurrent `join` / `leave` / `publish`; the subscriber map is
/// the only shared mutable state and it lives behind a concurrent map.
pub struct EventBroadcaster {
    subscribers: DashMap<ConnectionId, Subscriber>,
}

impl EventBroadcaster {
    /// Create an empty broadcaster.
    pub fn new() -> Self {
        Self {
            subscribers: DashMap::new(),
        }
    }

    /// Register a subscriber and return its delivery queue.
    ///
    /// Idempotent per connection id: joining again replaces the previous
    /// registration, closing the old queue.
    pub fn join(&self, connection_id: ConnectionId) -> mpsc::UnboundedReceiver<CallArrivalEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.insert(
            connection_id,
            Subscriber {
                tx,
                groups: HashSet::new(),
            },
        );
        debug!(%connection_id, total = self.subscribers.len(), "Subscriber joined");
        rx
    }

    /// Remove a subscriber. Safe to call repeatedly or with an unknown id.
    pub fn leave(&self, connection_id: ConnectionId) {
        if self.subscribers.remove(&connection_id).is_some() {
            debug!(%connection_id, total = self.subscribers.len(), "Subscriber left");
        }
    }

    /// Add a subscriber to an ad-hoc fan-out group.
    ///
    /// Returns `false` if the connection is not registered.
    pub fn join_group(&self, connection_id: ConnectionId, group: impl Into<String>) -> bool {
        match self.subscribers.get_mut(&connection_id) {
            Some(mut entry) => {
                let group = group.into();
                debug!(%connection_id, group = %group, "Subscriber joined group");
                entry.groups.insert(group);
                true
            }
            None => false,
        }
    }

    /// Deliver `event` to every currently registered subscriber.
    ///
    /// Returns how many subscribers the event was queued for. Publishing
    /// with zero subscribers is not an error. A subscriber whose queue has
    /// closed is pruned without affecting delivery to the others.
    pub fn publish(&self, event: &CallArrivalEvent) -> usize {
        self.publish_filtered(event, |_| true)
    }

    /// Deliver `event` only to subscribers that joined `group`.
    pub fn publish_to_group(&self, group: &str, event: &CallArrivalEvent) -> usize {
        self.publish_filtered(event, |sub| sub.groups.contains(group))
    }

    fn publish_filtered<F>(&self, event: &CallArrivalEvent, mut matches: F) -> usize
    where
        F: FnMut(&Subscriber) -> bool,
    {
        let mut delivered = 0;
        let mut dead: Vec<ConnectionId> = Vec::new();

        for entry in self.subscribers.iter() {
            if !matches(entry.value()) {
                continue;
            }
            if entry.value().tx.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                // Receiver dropped without an explicit leave; prune below,
                // outside the iterator, so the shard lock is not held.
                dead.push(*entry.key());
            }
        }

        for id in dead {
            self.leave(id);
        }

        trace!(
            call_sid = %event.call_sid,
            delivered,
            "Published call arrival event"
        );
        delivered
    }

    /// Number of currently registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(sid: &str) -> CallArrivalEvent {
        CallArrivalEvent::new("+353851234567", sid)
    }

    #[tokio::test]
    async fn every_subscriber_receives_each_event_in_publish_order() {
        let hub = EventBroadcaster::new();
        let mut rx_a = hub.join(Uuid::new_v4());
        let mut rx_b = hub.join(Uuid::new_v4());

        for sid in ["CA1", "CA2", "CA3"] {
            assert_eq!(hub.publish(&event(sid)), 2);
        }

        for rx in [&mut rx_a, &mut rx_b] {
            for sid in ["CA1", "CA2", "CA3"] {
                assert_eq!(rx.recv().await.unwrap().call_sid, sid);
            }
        }
    }

    #[tokio::test]
    async fn join_then_leave_delivers_nothing() {
        let hub = EventBroadcaster::new();
        let id = Uuid::new_v4();
        let mut rx = hub.join(id);
        hub.leave(id);

        assert_eq!(hub.publish(&event("CA1")), 0);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn leave_is_safe_on_unknown_id_and_repeats() {
        let hub = EventBroadcaster::new();
        hub.leave(Uuid::new_v4());
        let id = Uuid::new_v4();
        let _rx = hub.join(id);
        hub.leave(id);
        hub.leave(id);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn publish_with_zero_subscribers_is_not_an_error() {
        let hub = EventBroadcaster::new();
        assert_eq!(hub.publish(&event("CA1")), 0);
    }

    #[tokio::test]
    async fn dropped_receiver_is_pruned_without_affecting_others() {
        let hub = EventBroadcaster::new();
        let healthy = Uuid::new_v4();
        let mut rx_healthy = hub.join(healthy);
        let rx_dead = hub.join(Uuid::new_v4());
        drop(rx_dead);

        assert_eq!(hub.publish(&event("CA1")), 1);
        assert_eq!(rx_healthy.recv().await.unwrap().call_sid, "CA1");
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn rejoin_replaces_previous_registration() {
        let hub = EventBroadcaster::new();
        let id = Uuid::new_v4();
        let mut old_rx = hub.join(id);
        let mut new_rx = hub.join(id);

        assert_eq!(hub.publish(&event("CA1")), 1);
        assert_eq!(hub.subscriber_count(), 1);
        assert!(old_rx.recv().await.is_none());
        assert_eq!(new_rx.recv().await.unwrap().call_sid, "CA1");
    }

    #[tokio::test]
    async fn group_publish_reaches_only_members() {
        let hub = EventBroadcaster::new();
        let member = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut rx_member = hub.join(member);
        let mut rx_other = hub.join(other);
        assert!(hub.join_group(member, "operators"));
        assert!(!hub.join_group(Uuid::new_v4(), "operators"));

        assert_eq!(hub.publish_to_group("operators", &event("CA1")), 1);
        assert_eq!(rx_member.recv().await.unwrap().call_sid, "CA1");
        assert!(rx_other.try_recv().is_err());
    }
}
