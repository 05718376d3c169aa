// Notification Hub: fan-out of plain-text progress messages to all
// currently connected subscribers.
//
// At-most-once, fire-and-forget: a subscriber that connects after a
// message was broadcast never receives it. A failed delivery removes
// that subscriber during the same broadcast call and never surfaces to
// the caller or blocks the remaining subscribers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

/// Opaque handle identifying one subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

#[derive(Clone, Default)]
pub struct NotificationHub {
    inner: Arc<HubInner>,
}

#[derive(Default)]
struct HubInner {
    // Single lock over the set: add/remove/broadcast are mutually
    // exclusive, so every broadcast sees a consistent snapshot.
    subscribers: Mutex<HashMap<u64, UnboundedSender<String>>>,
    next_id: AtomicU64,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber and return its handle plus the receiving
    /// end of its message channel.
    pub fn subscribe(&self) -> (SubscriberId, UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers.lock().insert(id, tx);
        (SubscriberId(id), rx)
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        self.inner.subscribers.lock().remove(&id.0);
    }

    /// Deliver `message` to every current subscriber, pruning any whose
    /// channel is closed. Never fails.
    pub fn broadcast(&self, message: &str) {
        let mut subscribers = self.inner.subscribers.lock();
        let before = subscribers.len();

        subscribers.retain(|_, tx| tx.send(message.to_string()).is_ok());

        let dropped = before - subscribers.len();
        if dropped > 0 {
            debug!("pruned {dropped} dead subscriber(s) during broadcast");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_reaches_all_subscribers() {
        let hub = NotificationHub::new();
        let (_a, mut rx_a) = hub.subscribe();
        let (_b, mut rx_b) = hub.subscribe();

        hub.broadcast("Page p1.jpg is processing");

        assert_eq!(rx_a.recv().await.unwrap(), "Page p1.jpg is processing");
        assert_eq!(rx_b.recv().await.unwrap(), "Page p1.jpg is processing");
    }

    #[tokio::test]
    async fn failed_delivery_removes_only_that_subscriber() {
        let hub = NotificationHub::new();
        let (_a, mut rx_a) = hub.subscribe();
        let (_b, rx_b) = hub.subscribe();
        let (_c, mut rx_c) = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 3);

        // Simulate a disconnected client
        drop(rx_b);

        hub.broadcast("first");
        assert_eq!(hub.subscriber_count(), 2);

        // Survivors still receive the next broadcast
        hub.broadcast("second");
        assert_eq!(rx_a.recv().await.unwrap(), "first");
        assert_eq!(rx_a.recv().await.unwrap(), "second");
        assert_eq!(rx_c.recv().await.unwrap(), "first");
        assert_eq!(rx_c.recv().await.unwrap(), "second");
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let hub = NotificationHub::new();
        let (id, mut rx) = hub.subscribe();

        hub.broadcast("before");
        hub.unsubscribe(id);
        hub.broadcast("after");

        assert_eq!(rx.recv().await.unwrap(), "before");
        // Channel is closed once the sender side is dropped by unsubscribe
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn late_subscriber_gets_no_replay() {
        let hub = NotificationHub::new();
        hub.broadcast("lost to the void");

        let (_id, mut rx) = hub.subscribe();
        hub.broadcast("live");
        assert_eq!(rx.recv().await.unwrap(), "live");
        assert!(rx.try_recv().is_err());
    }
}
