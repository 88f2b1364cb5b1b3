//! Activity entries — the display records of the operator console.
//!
//! An [`ActivityEntry`] is produced either by the event classifier (from a
//! backend push event) or by instrumented call sites publishing directly to
//! the bus. Entries are immutable once recorded; they are only ever removed
//! by capacity eviction or an explicit clear.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::EntryId;

/// Category of an activity entry, used for iconography and filtering in the
/// rendered feed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    /// Generic API traffic.
    Api,
    /// An agent entered a working phase.
    Agent,
    /// Workflow lifecycle (started / completed).
    Workflow,
    /// An outbound operation was initiated, or needs operator attention.
    Action,
    /// An operation completed successfully.
    Success,
    /// An operation failed.
    Error,
    /// Anything informational that fits no other bucket.
    Info,
}

/// All activity kind variants, for exhaustive testing.
pub const ALL_ACTIVITY_KINDS: &[ActivityKind] = &[
    ActivityKind::Api,
    ActivityKind::Agent,
    ActivityKind::Workflow,
    ActivityKind::Action,
    ActivityKind::Success,
    ActivityKind::Error,
    ActivityKind::Info,
];

/// A single record in the activity feed.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    /// Unique entry ID (UUID v7, time-ordered).
    pub id: EntryId,
    /// When the entry was recorded.
    pub timestamp: DateTime<Utc>,
    /// Display category.
    pub kind: ActivityKind,
    /// One-line human-readable title.
    pub title: String,
    /// Optional secondary line (correlation IDs, timings, payload excerpts).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ActivityEntry {
    /// Create an entry timestamped now, with a fresh ID.
    #[must_use]
    pub fn now(kind: ActivityKind, title: impl Into<String>, detail: Option<String>) -> Self {
        Self {
            id: EntryId::new(),
            timestamp: Utc::now(),
            kind,
            title: title.into(),
            detail,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
