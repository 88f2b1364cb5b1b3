//! In-process instrumentation bus.
//!
//! Components that do interesting work (the API client, command handlers,
//! background jobs) publish [`ActivityEntry`] values here; the console
//! subscribes and merges them with classified push events. The bus is a
//! process-wide singleton by convention: it holds its rolling buffer and
//! subscriber list for the life of the process and is never torn down, so
//! entries published while nothing subscribes are still replayable later.
//!
//! Fan-out is synchronous: subscribers are invoked inside `publish`, under
//! the bus lock, in registration order. Callbacks must not block and must
//! not call back into the bus.

use parking_lot::Mutex;
use tokio::sync::mpsc;

use fuega_core::constants::ACTIVITY_BUFFER_CAPACITY;
use fuega_core::{ActivityEntry, ActivityKind, RingBuffer};

/// Unsubscribe capability returned by the subscribe methods.
#[derive(Debug)]
pub struct SubscriberHandle(u64);

/// Invoked once per published entry; returning `false` drops the subscriber.
type SubscriberFn = Box<dyn Fn(&ActivityEntry) -> bool + Send>;

struct Subscriber {
    id: u64,
    notify: SubscriberFn,
}

struct BusInner {
    buffer: RingBuffer<ActivityEntry>,
    subscribers: Vec<Subscriber>,
    next_subscriber_id: u64,
}

/// Pub/sub fan-out with a bounded replay buffer.
pub struct InstrumentationBus {
    inner: Mutex<BusInner>,
}

impl Default for InstrumentationBus {
    fn default() -> Self {
        Self::new(ACTIVITY_BUFFER_CAPACITY)
    }
}

impl InstrumentationBus {
    /// Create a bus with the given replay-buffer capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(BusInner {
                buffer: RingBuffer::new(capacity),
                subscribers: Vec::new(),
                next_subscriber_id: 0,
            }),
        }
    }

    /// Record an entry and fan it out to live subscribers, in registration
    /// order.
    pub fn publish(&self, entry: ActivityEntry) {
        let mut inner = self.inner.lock();
        inner.buffer.push(entry.clone());
        inner
            .subscribers
            .retain(|subscriber| (subscriber.notify)(&entry));
    }

    /// Build, publish, and return an entry in one step. The returned value
    /// lets call sites keep the assigned ID for later correlation.
    pub fn record(
        &self,
        kind: ActivityKind,
        title: impl Into<String>,
        detail: Option<String>,
    ) -> ActivityEntry {
        let entry = ActivityEntry::now(kind, title, detail);
        self.publish(entry.clone());
        entry
    }

    /// Register a callback subscriber. Returns the buffered history (newest
    /// first) captured atomically with the registration, so a consumer can
    /// seed its view without missing or double-seeing an entry.
    pub fn subscribe_with<F>(&self, notify: F) -> (SubscriberHandle, Vec<ActivityEntry>)
    where
        F: Fn(&ActivityEntry) -> bool + Send + 'static,
    {
        let mut inner = self.inner.lock();
        let id = inner.next_subscriber_id;
        inner.next_subscriber_id += 1;
        inner.subscribers.push(Subscriber {
            id,
            notify: Box::new(notify),
        });
        (SubscriberHandle(id), inner.buffer.to_vec())
    }

    /// Register a channel subscriber. The receiver sees entries published
    /// after this call only; use [`all`](Self::all) or
    /// [`subscribe_with`](Self::subscribe_with) for history.
    pub fn subscribe(&self) -> (SubscriberHandle, mpsc::UnboundedReceiver<ActivityEntry>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (handle, _history) = self.subscribe_with(move |entry| tx.send(entry.clone()).is_ok());
        (handle, rx)
    }

    /// Remove a subscriber. Harmless if the handle is stale.
    pub fn unsubscribe(&self, handle: SubscriberHandle) {
        self.inner
            .lock()
            .subscribers
            .retain(|subscriber| subscriber.id != handle.0);
    }

    /// All buffered entries, newest first.
    #[must_use]
    pub fn all(&self) -> Vec<ActivityEntry> {
        self.inner.lock().buffer.to_vec()
    }

    /// Drop all buffered entries. Subscribers stay registered.
    pub fn clear(&self) {
        self.inner.lock().buffer.clear();
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn entry(title: &str) -> ActivityEntry {
        ActivityEntry::now(ActivityKind::Info, title, None)
    }

    #[test]
    fn publish_buffers_newest_first() {
        let bus = InstrumentationBus::new(10);
        bus.publish(entry("first"));
        bus.publish(entry("second"));

        let all = bus.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].title, "second");
        assert_eq!(all[1].title, "first");
    }

    #[test]
    fn buffer_evicts_oldest_at_capacity() {
        let bus = InstrumentationBus::new(2);
        bus.publish(entry("a"));
        bus.publish(entry("b"));
        bus.publish(entry("c"));

        let titles: Vec<_> = bus.all().iter().map(|e| e.title.clone()).collect();
        assert_eq!(titles, vec!["c", "b"]);
    }

    #[tokio::test]
    async fn subscriber_receives_after_subscribing_only() {
        let bus = InstrumentationBus::new(10);
        bus.publish(entry("before"));

        let (handle, mut rx) = bus.subscribe();
        bus.publish(entry("after"));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.title, "after");
        assert!(rx.try_recv().is_err(), "history is not replayed on the channel");

        bus.unsubscribe(handle);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn subscribe_with_returns_history_atomically() {
        let bus = InstrumentationBus::new(10);
        bus.publish(entry("one"));
        bus.publish(entry("two"));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let (_handle, history) = bus.subscribe_with(move |e| {
            sink.lock().push(e.title.clone());
            true
        });

        let titles: Vec<_> = history.iter().map(|e| e.title.clone()).collect();
        assert_eq!(titles, vec!["two", "one"]);

        bus.publish(entry("three"));
        assert_eq!(*seen.lock(), vec!["three"], "history is not re-delivered");
    }

    #[test]
    fn callback_returning_false_is_pruned() {
        let bus = InstrumentationBus::new(10);
        let _ = bus.subscribe_with(|_| false);

        bus.publish(entry("x"));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn dropped_receiver_is_pruned_on_publish() {
        let bus = InstrumentationBus::new(10);
        let (_handle, rx) = bus.subscribe();
        drop(rx);

        bus.publish(entry("x"));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn clear_empties_buffer_but_keeps_subscribers() {
        let bus = InstrumentationBus::new(10);
        let (_handle, _rx) = bus.subscribe();
        bus.publish(entry("a"));

        bus.clear();
        assert!(bus.all().is_empty());
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn record_builds_and_returns_entry() {
        let bus = InstrumentationBus::new(10);
        let entry = bus.record(ActivityKind::Action, "POST /api/leads", Some("queued".to_owned()));

        let all = bus.all();
        assert_eq!(all[0].id, entry.id, "returned entry carries the buffered ID");
        assert_eq!(all[0].kind, ActivityKind::Action);
        assert_eq!(all[0].title, "POST /api/leads");
        assert_eq!(all[0].detail.as_deref(), Some("queued"));
    }

    #[test]
    fn default_capacity_matches_constant() {
        let bus = InstrumentationBus::default();
        assert_eq!(bus.inner.lock().buffer.capacity(), ACTIVITY_BUFFER_CAPACITY);
    }
}
