//! Named constants for the realtime pipeline.
//!
//! Buffer capacities and the reconnection delay are fixed by design but kept
//! as named constants so tests and configuration can reference them.

/// Capacity of the connection manager's rolling buffer of inbound events.
pub const INBOUND_BUFFER_CAPACITY: usize = 100;

/// Capacity of the instrumentation bus buffer.
pub const ACTIVITY_BUFFER_CAPACITY: usize = 300;

/// Capacity of the activity console's merged view.
pub const CONSOLE_BUFFER_CAPACITY: usize = 300;

/// Delay between a transport close/error and the next connection attempt.
pub const RECONNECT_DELAY_MS: u64 = 3000;

/// Maximum length of a classifier-generated detail string, in characters.
pub const MAX_DETAIL_LEN: usize = 100;

/// Outbound event name for client chat/command messages.
///
/// The backend only accepts whitelisted event names from clients; everything
/// else is rejected with an error frame.
pub const CLIENT_MESSAGE_EVENT: &str = "client.message";

/// Outbound event name for client keepalive pings.
pub const CLIENT_PING_EVENT: &str = "client.ping";
