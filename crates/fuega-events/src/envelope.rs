//! The push-connection wire format.
//!
//! Every frame in either direction is a UTF-8 JSON object
//! `{"event": string, "data": any}`. The backend adds a `"source"` key on
//! some frames; unrecognized top-level keys are ignored. A frame without an
//! `"event"` key parses with an empty name, which the classifier treats as
//! noise.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A JSON envelope as sent over the wire, in either direction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PushEnvelope {
    /// Namespaced event name (e.g. `agent.ceo.running`).
    #[serde(default)]
    pub event: String,
    /// Event payload; shape varies by event name.
    #[serde(default)]
    pub data: Value,
}

impl PushEnvelope {
    /// Build an outbound envelope.
    #[must_use]
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Parse a raw text frame.
    ///
    /// Returns an error for malformed JSON; the caller drops the frame
    /// without tearing the connection down.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Serialize for transmission.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Convert into an [`InboundEvent`] stamped with the arrival time.
    #[must_use]
    pub fn into_inbound(self) -> InboundEvent {
        InboundEvent {
            name: self.event,
            payload: self.data,
            received_at: Utc::now(),
        }
    }
}

/// An inbound push event as recorded by the connection manager.
///
/// Immutable once recorded; retained newest-first in the manager's rolling
/// buffer and broadcast to all attached listeners.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEvent {
    /// Namespaced event name; empty if the frame carried no `"event"` key.
    pub name: String,
    /// Raw payload.
    pub payload: Value,
    /// Client-side arrival timestamp.
    pub received_at: DateTime<Utc>,
}

impl InboundEvent {
    /// Construct an event arriving now. Primarily useful in tests.
    #[must_use]
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
            received_at: Utc::now(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
