//! # fuega-events
//!
//! Push-event wire format and classification for the Fuega console.
//!
//! - **Envelope**: the `{"event": ..., "data": ...}` JSON frame exchanged
//!   with the backend over the push connection
//! - **Typed events**: `PushEvent`, a sum type parsed from namespaced event
//!   names with a graceful fallback variant
//! - **Agent table**: static slug-to-display-name mapping for the agent fleet
//! - **Classifier**: the pure `classify` function turning inbound events
//!   into renderable activity entries, or discarding them as noise

#![deny(unsafe_code)]

pub mod agents;
pub mod classify;
pub mod envelope;
pub mod types;

pub use classify::classify;
pub use envelope::{InboundEvent, PushEnvelope};
pub use types::{AgentPhase, PushEvent, WorkflowPhase};
