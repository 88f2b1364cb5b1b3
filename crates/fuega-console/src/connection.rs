//! The shared push-connection manager.
//!
//! One [`ConnectionManager`] owns at most one live WebSocket to the backend
//! regardless of how many observers attach. Lifecycle is reference-counted:
//! the first [`attach`](ConnectionManager::attach) opens the transport, the
//! last [`detach`](ConnectionManager::detach) closes it, cancels any pending
//! reconnect, and resets manager state. While at least one listener remains,
//! reconnection is retried indefinitely at a fixed delay.
//!
//! Listeners receive [`ConnectionNotice`] values — connectivity changes and
//! inbound events — synchronously at broadcast time, in attach order, either
//! through a callback ([`attach_with`](ConnectionManager::attach_with)) or a
//! channel ([`attach`](ConnectionManager::attach)). The transport
//! and the rolling event buffer are exclusively owned by the manager;
//! [`snapshot`](ConnectionManager::snapshot) hands out copies so a late
//! subscriber can seed itself without missing buffered history.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use fuega_core::RingBuffer;
use fuega_core::constants::{CLIENT_MESSAGE_EVENT, CLIENT_PING_EVENT};
use fuega_events::{InboundEvent, PushEnvelope};

use crate::config::ConsoleConfig;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport, no pending attempt (or waiting out the reconnect delay).
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// The transport is live.
    Connected,
}

/// What the manager delivers to attached listeners.
#[derive(Clone, Debug)]
pub enum ConnectionNotice {
    /// The binary connectivity indicator changed.
    Connectivity {
        /// Whether the transport is now live.
        connected: bool,
    },
    /// An inbound push event arrived.
    Event(InboundEvent),
}

/// Detach capability returned by [`ConnectionManager::attach`].
#[derive(Debug)]
pub struct ListenerHandle(u64);

/// Synchronous copy of manager state for newly attached listeners.
#[derive(Clone, Debug)]
pub struct ConnectionSnapshot {
    /// Buffered inbound events, newest first.
    pub events: Vec<InboundEvent>,
    /// Whether the transport is currently live.
    pub connected: bool,
}

/// Invoked once per notice; returning `false` drops the listener.
type ListenerFn = Box<dyn Fn(&ConnectionNotice) -> bool + Send>;

struct Listener {
    id: u64,
    notify: ListenerFn,
}

struct Inner {
    state: ConnectionState,
    buffer: RingBuffer<InboundEvent>,
    listeners: Vec<Listener>,
    next_listener_id: u64,
    /// Present iff the connection task is alive. Cancelling it closes the
    /// transport and aborts any pending reconnect sleep.
    cancel: Option<CancellationToken>,
    /// Sender into the live transport's write half.
    outbound: Option<mpsc::UnboundedSender<Message>>,
}

/// Reference-counted owner of the single push connection.
pub struct ConnectionManager {
    ws_url: String,
    reconnect_delay: Duration,
    inner: Mutex<Inner>,
}

impl ConnectionManager {
    /// Create a manager. No connection is opened until the first attach.
    #[must_use]
    pub fn new(config: &ConsoleConfig) -> Arc<Self> {
        Arc::new(Self {
            ws_url: config.ws_url.clone(),
            reconnect_delay: Duration::from_millis(config.reconnect_delay_ms),
            inner: Mutex::new(Inner {
                state: ConnectionState::Disconnected,
                buffer: RingBuffer::new(config.inbound_buffer_capacity),
                listeners: Vec::new(),
                next_listener_id: 0,
                cancel: None,
                outbound: None,
            }),
        })
    }

    /// Register a callback listener. The first listener opens the
    /// connection; further attaches while connecting or connected never open
    /// a second transport.
    ///
    /// The callback runs synchronously at broadcast time, under the manager
    /// lock; it must not block and must not call back into the manager. It
    /// sees only notices delivered after this call; combine with
    /// [`snapshot`](Self::snapshot) to seed from buffered history.
    pub fn attach_with<F>(self: &Arc<Self>, notify: F) -> ListenerHandle
    where
        F: Fn(&ConnectionNotice) -> bool + Send + 'static,
    {
        let mut inner = self.inner.lock();
        let id = inner.next_listener_id;
        inner.next_listener_id += 1;
        inner.listeners.push(Listener {
            id,
            notify: Box::new(notify),
        });

        if inner.cancel.is_none() {
            let cancel = CancellationToken::new();
            inner.cancel = Some(cancel.clone());
            inner.state = ConnectionState::Connecting;
            let manager = Arc::clone(self);
            drop(inner);
            let _ = tokio::spawn(async move { manager.run(cancel).await });
        }

        ListenerHandle(id)
    }

    /// Register a channel listener; convenience wrapper over
    /// [`attach_with`](Self::attach_with).
    pub fn attach(
        self: &Arc<Self>,
    ) -> (ListenerHandle, mpsc::UnboundedReceiver<ConnectionNotice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = self.attach_with(move |notice| tx.send(notice.clone()).is_ok());
        (handle, rx)
    }

    /// Remove a listener. When the last one detaches, the transport closes,
    /// any pending reconnect is cancelled, and state resets to initial.
    pub fn detach(&self, handle: ListenerHandle) {
        let mut inner = self.inner.lock();
        inner.listeners.retain(|listener| listener.id != handle.0);
        if inner.listeners.is_empty() {
            Self::reset(&mut inner);
        }
    }

    /// Synchronous copy of the rolling buffer and connectivity flag.
    #[must_use]
    pub fn snapshot(&self) -> ConnectionSnapshot {
        let inner = self.inner.lock();
        ConnectionSnapshot {
            events: inner.buffer.to_vec(),
            connected: inner.state == ConnectionState::Connected,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    /// Number of attached listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    /// Best-effort publish to the backend. Silently dropped unless connected;
    /// callers must not treat this as reliable delivery.
    pub fn send(&self, name: &str, payload: Value) {
        let inner = self.inner.lock();
        if inner.state != ConnectionState::Connected {
            debug!(event = name, "send while disconnected, dropping");
            return;
        }
        let Some(outbound) = &inner.outbound else {
            return;
        };
        match PushEnvelope::new(name, payload).to_frame() {
            Ok(frame) => {
                let _ = outbound.send(Message::Text(frame.into()));
            }
            Err(e) => warn!(event = name, error = %e, "failed to serialize outbound envelope"),
        }
    }

    /// Send an operator chat/command message. The backend only accepts
    /// whitelisted client event names; this is one of them.
    pub fn send_message(&self, text: &str) {
        self.send(CLIENT_MESSAGE_EVENT, json!({ "text": text }));
    }

    /// Send an application-level keepalive ping.
    pub fn ping(&self) {
        self.send(CLIENT_PING_EVENT, json!({}));
    }

    /// Connection task: connect, pump frames, reconnect after the fixed
    /// delay for as long as listeners remain. At most one of these runs per
    /// manager; the token cancels it on final detach.
    async fn run(self: Arc<Self>, cancel: CancellationToken) {
        loop {
            {
                let mut inner = self.inner.lock();
                if cancel.is_cancelled() {
                    return;
                }
                if inner.listeners.is_empty() {
                    Self::reset(&mut inner);
                    return;
                }
                inner.state = ConnectionState::Connecting;
            }

            let attempt = tokio::select! {
                () = cancel.cancelled() => return,
                result = connect_async(&self.ws_url) => result,
            };

            match attempt {
                Ok((ws, _response)) => {
                    debug!(url = %self.ws_url, "push connection established");
                    self.drive(ws, &cancel).await;
                    if cancel.is_cancelled() {
                        return;
                    }
                }
                Err(e) => {
                    debug!(url = %self.ws_url, error = %e, "push connection attempt failed");
                }
            }

            let keep_trying = {
                let mut inner = self.inner.lock();
                if cancel.is_cancelled() {
                    return;
                }
                let was_connected = inner.state == ConnectionState::Connected;
                inner.state = ConnectionState::Disconnected;
                inner.outbound = None;
                if was_connected {
                    Self::notify(&mut inner, &ConnectionNotice::Connectivity { connected: false });
                }
                if inner.listeners.is_empty() {
                    Self::reset(&mut inner);
                    false
                } else {
                    true
                }
            };
            if !keep_trying {
                return;
            }

            // Single pending reconnect; cancelled by the last detach
            tokio::select! {
                () = cancel.cancelled() => return,
                () = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }
    }

    /// Pump one live transport until it closes, errors, or teardown.
    async fn drive(&self, ws: WsStream, cancel: &CancellationToken) {
        let (mut sink, mut stream) = ws.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();

        {
            let mut inner = self.inner.lock();
            if cancel.is_cancelled() {
                return;
            }
            inner.state = ConnectionState::Connected;
            inner.outbound = Some(out_tx);
            Self::notify(&mut inner, &ConnectionNotice::Connectivity { connected: true });
        }

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    let _ = sink.close().await;
                    return;
                }
                outbound = out_rx.recv() => {
                    match outbound {
                        Some(message) => {
                            if sink.send(message).await.is_err() {
                                return;
                            }
                        }
                        // Sender dropped during teardown
                        None => return,
                    }
                }
                frame = stream.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => self.record_frame(text.as_str()),
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                        // Ping/pong/binary keep the transport healthy but carry no events
                        Some(Ok(_)) => {}
                    }
                }
            }
        }
    }

    /// Parse one inbound frame, record it, and fan it out. Malformed frames
    /// are dropped without touching the connection.
    fn record_frame(&self, text: &str) {
        let envelope = match PushEnvelope::parse(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "dropping malformed push frame");
                return;
            }
        };
        let event = envelope.into_inbound();
        let mut inner = self.inner.lock();
        if inner.state != ConnectionState::Connected {
            return;
        }
        inner.buffer.push(event.clone());
        Self::notify(&mut inner, &ConnectionNotice::Event(event));
    }

    /// Broadcast to all listeners in attach order, pruning any whose
    /// callback reports it is gone.
    fn notify(inner: &mut Inner, notice: &ConnectionNotice) {
        inner
            .listeners
            .retain(|listener| (listener.notify)(notice));
    }

    /// Return manager-local state to initial. Cancels the connection task if
    /// one is alive.
    fn reset(inner: &mut Inner) {
        if let Some(cancel) = inner.cancel.take() {
            cancel.cancel();
        }
        inner.state = ConnectionState::Disconnected;
        inner.outbound = None;
        inner.buffer.clear();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// A URL nothing listens on; connect attempts fail fast.
    fn unreachable_config() -> ConsoleConfig {
        ConsoleConfig {
            ws_url: "ws://127.0.0.1:9/ws".to_owned(),
            ..ConsoleConfig::default()
        }
    }

    #[tokio::test]
    async fn starts_disconnected_and_empty() {
        let manager = ConnectionManager::new(&ConsoleConfig::default());
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        let snapshot = manager.snapshot();
        assert!(snapshot.events.is_empty());
        assert!(!snapshot.connected);
    }

    #[tokio::test]
    async fn send_while_disconnected_is_silent() {
        let manager = ConnectionManager::new(&ConsoleConfig::default());
        manager.send("client.message", json!({"text": "hello"}));
        manager.send_message("hello again");
        manager.ping();
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn attach_registers_and_starts_connecting() {
        let manager = ConnectionManager::new(&unreachable_config());
        let (handle, _rx) = manager.attach();
        assert_eq!(manager.listener_count(), 1);
        // Immediately after attach the task is either mid-attempt or already
        // waiting out the reconnect delay
        assert_ne!(manager.state(), ConnectionState::Connected);
        manager.detach(handle);
        assert_eq!(manager.listener_count(), 0);
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn second_attach_does_not_spawn_second_task() {
        let manager = ConnectionManager::new(&unreachable_config());
        let (h1, _rx1) = manager.attach();
        let token_before = manager.inner.lock().cancel.clone();
        let (h2, _rx2) = manager.attach();
        let token_after = manager.inner.lock().cancel.clone();
        assert!(token_before.is_some());
        // Same task token: no second connection task was spawned
        assert!(matches!(
            (&token_before, &token_after),
            (Some(_), Some(_))
        ));
        assert_eq!(manager.listener_count(), 2);
        manager.detach(h1);
        assert_eq!(manager.listener_count(), 1);
        manager.detach(h2);
        assert_eq!(manager.listener_count(), 0);
    }

    #[tokio::test]
    async fn detach_with_stale_handle_is_harmless() {
        let manager = ConnectionManager::new(&unreachable_config());
        let (handle, _rx) = manager.attach();
        manager.detach(handle);
        manager.detach(ListenerHandle(999));
        assert_eq!(manager.listener_count(), 0);
    }

    #[tokio::test]
    async fn last_detach_cancels_pending_reconnect() {
        let manager = ConnectionManager::new(&unreachable_config());
        let (handle, _rx) = manager.attach();
        let token = manager.inner.lock().cancel.clone().unwrap();
        manager.detach(handle);
        assert!(token.is_cancelled(), "teardown must cancel the task token");
        assert!(manager.inner.lock().cancel.is_none());
    }

    /// Inject a listener and force the connected state without a socket, so
    /// frame handling can be tested in isolation.
    fn forced_connected(
        manager: &Arc<ConnectionManager>,
    ) -> mpsc::UnboundedReceiver<ConnectionNotice> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = manager.inner.lock();
        inner.listeners.push(Listener {
            id: 42,
            notify: Box::new(move |notice| tx.send(notice.clone()).is_ok()),
        });
        inner.state = ConnectionState::Connected;
        rx
    }

    #[tokio::test]
    async fn valid_frame_is_buffered_and_broadcast() {
        let manager = ConnectionManager::new(&ConsoleConfig::default());
        let mut rx = forced_connected(&manager);

        manager.record_frame(r#"{"event":"agent.ceo.running","data":{"run_id":1}}"#);

        let snapshot = manager.snapshot();
        assert_eq!(snapshot.events.len(), 1);
        assert_eq!(snapshot.events[0].name, "agent.ceo.running");

        match rx.recv().await {
            Some(ConnectionNotice::Event(event)) => {
                assert_eq!(event.name, "agent.ceo.running");
                assert_eq!(event.payload["run_id"], 1);
            }
            other => panic!("expected event notice, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_frame_is_dropped() {
        let manager = ConnectionManager::new(&ConsoleConfig::default());
        let mut rx = forced_connected(&manager);

        manager.record_frame("not json at all");
        manager.record_frame(r#"{"event":"lead.created","data":{}}"#);

        // Only the valid frame made it through
        assert_eq!(manager.snapshot().events.len(), 1);
        match rx.recv().await {
            Some(ConnectionNotice::Event(event)) => assert_eq!(event.name, "lead.created"),
            other => panic!("expected event notice, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn inbound_buffer_evicts_oldest() {
        let config = ConsoleConfig {
            inbound_buffer_capacity: 3,
            ..ConsoleConfig::default()
        };
        let manager = ConnectionManager::new(&config);
        let _rx = forced_connected(&manager);

        for i in 0..5 {
            manager.record_frame(&format!(r#"{{"event":"lead.{i}","data":null}}"#));
        }

        let names: Vec<_> = manager
            .snapshot()
            .events
            .iter()
            .map(|e| e.name.clone())
            .collect();
        assert_eq!(names, vec!["lead.4", "lead.3", "lead.2"]);
    }

    #[tokio::test]
    async fn dead_listeners_are_pruned_on_notify() {
        let manager = ConnectionManager::new(&ConsoleConfig::default());
        let rx = forced_connected(&manager);
        drop(rx);

        manager.record_frame(r#"{"event":"lead.created","data":{}}"#);
        assert_eq!(manager.listener_count(), 0, "closed receiver should be pruned");
    }

    #[tokio::test]
    async fn frames_ignored_unless_connected() {
        let manager = ConnectionManager::new(&ConsoleConfig::default());
        // No forced state: manager is Disconnected
        manager.record_frame(r#"{"event":"lead.created","data":{}}"#);
        assert!(manager.snapshot().events.is_empty());
    }

    #[tokio::test]
    async fn merged_view_keeps_burst_arrival_order() {
        use crate::bus::InstrumentationBus;
        use crate::console::ActivityConsole;
        use fuega_core::ActivityKind;

        let manager = ConnectionManager::new(&unreachable_config());
        let bus = Arc::new(InstrumentationBus::new(64));
        let console = ActivityConsole::start(Arc::clone(&manager), Arc::clone(&bus), 64);

        // Interleave both sources without yielding; on the current-thread
        // runtime nothing drains until the first await, so both sources have
        // pending items at once when the console task finally runs
        manager.inner.lock().state = ConnectionState::Connected;
        for i in 0..10 {
            let _ = bus.record(ActivityKind::Info, format!("local {i}a"), None);
            manager.record_frame(&format!(r#"{{"event":"lead.{i}","data":null}}"#));
            let _ = bus.record(ActivityKind::Info, format!("local {i}b"), None);
        }

        for _ in 0..200 {
            if console.len() == 30 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let mut expected = Vec::new();
        for i in (0..10).rev() {
            expected.push(format!("local {i}b"));
            expected.push(format!("lead {i}"));
            expected.push(format!("local {i}a"));
        }
        let titles: Vec<_> = console.entries().iter().map(|e| e.title.clone()).collect();
        assert_eq!(titles, expected, "merged view must reflect exact arrival order");
    }
}
