//! The merged operator activity view.
//!
//! [`ActivityConsole`] is one reader over two producers: classified push
//! events from the [`ConnectionManager`] and locally published entries from
//! the [`InstrumentationBus`]. Entries from both sources interleave in
//! arrival order into a single bounded, newest-first view.
//!
//! Arrival order is preserved by construction: both sources enqueue into
//! one shared queue synchronously at publish/broadcast time, so dequeue
//! order equals the order in which the sources fired. Two separate
//! channels drained with `select!` would not give this guarantee; when
//! both are non-empty the poll order is arbitrary.
//!
//! Dropping the console detaches from both sources; the connection closes
//! when it was the last listener, while the bus always survives.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use fuega_core::{ActivityEntry, RingBuffer};
use fuega_events::classify;

use crate::bus::{InstrumentationBus, SubscriberHandle};
use crate::connection::{ConnectionManager, ConnectionNotice, ListenerHandle};

/// One merged queue item; tagged with the source it arrived from.
enum Feed {
    Local(ActivityEntry),
    Push(ConnectionNotice),
}

struct ConsoleShared {
    entries: RingBuffer<ActivityEntry>,
    connected: bool,
}

/// Live merged view of push activity and local instrumentation.
pub struct ActivityConsole {
    shared: Arc<Mutex<ConsoleShared>>,
    bus: Arc<InstrumentationBus>,
    manager: Arc<ConnectionManager>,
    bus_handle: Option<SubscriberHandle>,
    conn_handle: Option<ListenerHandle>,
    task: JoinHandle<()>,
}

impl ActivityConsole {
    /// Attach to both sources, seed from the bus's buffered history, and
    /// start merging live entries.
    ///
    /// The manager's rolling buffer is not replayed into the view: it exists
    /// for replay-on-attach, and re-classifying it here would duplicate
    /// entries every time a console restarts against a live manager. Only
    /// events arriving after this call are classified.
    #[must_use]
    pub fn start(
        manager: Arc<ConnectionManager>,
        bus: Arc<InstrumentationBus>,
        capacity: usize,
    ) -> Self {
        // Both sources push into this queue synchronously as they fire, so
        // the task below drains true arrival order
        let (feed_tx, mut feed_rx) = tokio::sync::mpsc::unbounded_channel();

        let local_tx = feed_tx.clone();
        let (bus_handle, history) =
            bus.subscribe_with(move |entry| local_tx.send(Feed::Local(entry.clone())).is_ok());
        let conn_handle =
            manager.attach_with(move |notice| feed_tx.send(Feed::Push(notice.clone())).is_ok());
        let snapshot = manager.snapshot();

        let mut entries = RingBuffer::new(capacity);
        // Seed oldest-first so the ring ends up newest-first; the history
        // vec was captured atomically with the subscription
        for entry in history.into_iter().rev() {
            entries.push(entry);
        }

        let shared = Arc::new(Mutex::new(ConsoleShared {
            entries,
            connected: snapshot.connected,
        }));

        let task_shared = Arc::clone(&shared);
        let task = tokio::spawn(async move {
            while let Some(feed) = feed_rx.recv().await {
                match feed {
                    Feed::Local(entry) => task_shared.lock().entries.push(entry),
                    Feed::Push(ConnectionNotice::Connectivity { connected }) => {
                        debug!(connected, "console connectivity changed");
                        task_shared.lock().connected = connected;
                    }
                    Feed::Push(ConnectionNotice::Event(event)) => {
                        if let Some(entry) = classify(&event) {
                            task_shared.lock().entries.push(entry);
                        }
                    }
                }
            }
        });

        Self {
            shared,
            bus,
            manager,
            bus_handle: Some(bus_handle),
            conn_handle: Some(conn_handle),
            task,
        }
    }

    /// Merged entries, newest first.
    #[must_use]
    pub fn entries(&self) -> Vec<ActivityEntry> {
        self.shared.lock().entries.to_vec()
    }

    /// Whether the push connection is currently live.
    #[must_use]
    pub fn connected(&self) -> bool {
        self.shared.lock().connected
    }

    /// Number of entries currently in the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.lock().entries.len()
    }

    /// Whether the view is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.lock().entries.is_empty()
    }

    /// Empty the view and the bus replay buffer. The connection manager's
    /// event buffer is deliberately left alone so a future attach still
    /// replays transport history.
    pub fn clear(&self) {
        self.shared.lock().entries.clear();
        self.bus.clear();
    }
}

impl Drop for ActivityConsole {
    fn drop(&mut self) {
        self.task.abort();
        if let Some(handle) = self.conn_handle.take() {
            self.manager.detach(handle);
        }
        if let Some(handle) = self.bus_handle.take() {
            self.bus.unsubscribe(handle);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
