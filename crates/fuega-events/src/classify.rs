//! The pure event classifier.
//!
//! `classify` maps a raw inbound push event to a renderable
//! [`ActivityEntry`], or `None` for transport-health noise. Matching is
//! ordered, first match wins:
//!
//! 1. Agent/workflow lifecycle events, rendered with a resolved display
//!    name for the identifier
//! 2. Known control events (`workflow.approval_needed`,
//!    `approval.requested`) with domain-specific detail extraction
//! 3. Keepalive signals and unnamed frames → `None`
//! 4. Everything else → generic entry, so unknown future event names degrade
//!    gracefully instead of disappearing

use serde_json::Value;

use fuega_core::constants::MAX_DETAIL_LEN;
use fuega_core::{ActivityEntry, ActivityKind};

use crate::agents::{agent_display_name, humanize};
use crate::envelope::InboundEvent;
use crate::types::{AgentPhase, PushEvent, WorkflowPhase};

/// Classify an inbound push event into a display record, or discard it.
#[must_use]
pub fn classify(event: &InboundEvent) -> Option<ActivityEntry> {
    match PushEvent::from_name(&event.name) {
        PushEvent::AgentLifecycle { slug, phase } => {
            let label = agent_display_name(&slug);
            let (kind, title) = match phase {
                AgentPhase::Running => (ActivityKind::Agent, format!("{label} running")),
                AgentPhase::Completed => (ActivityKind::Success, format!("{label} completed")),
            };
            let detail = field(&event.payload, "action").or_else(|| field(&event.payload, "workflow"));
            Some(ActivityEntry::now(kind, title, detail))
        }
        PushEvent::WorkflowLifecycle { name, phase } => {
            let verb = match phase {
                WorkflowPhase::Started => "started",
                WorkflowPhase::Completed => "completed",
            };
            let title = format!("{} {verb}", humanize(&name));
            let detail = field(&event.payload, "run_id").map(|id| format!("run {id}"));
            Some(ActivityEntry::now(ActivityKind::Workflow, title, detail))
        }
        PushEvent::WorkflowApprovalNeeded => {
            let detail = match (field(&event.payload, "workflow"), field(&event.payload, "run_id")) {
                (Some(workflow), Some(id)) => Some(format!("{workflow} run {id}")),
                (Some(workflow), None) => Some(workflow),
                (None, Some(id)) => Some(format!("run {id}")),
                (None, None) => None,
            };
            Some(ActivityEntry::now(
                ActivityKind::Action,
                "Workflow paused for approval",
                detail,
            ))
        }
        PushEvent::ApprovalRequested => {
            let agent = field(&event.payload, "agent_slug").map(|slug| agent_display_name(&slug));
            let detail = match (agent, field(&event.payload, "action_name")) {
                (Some(agent), Some(action)) => Some(format!("{agent}: {action}")),
                (Some(agent), None) => Some(agent),
                (None, Some(action)) => Some(action),
                (None, None) => None,
            };
            Some(ActivityEntry::now(
                ActivityKind::Action,
                "Approval requested",
                detail,
            ))
        }
        PushEvent::Noise => None,
        PushEvent::Other { name } => Some(ActivityEntry::now(
            ActivityKind::Info,
            humanize(&name),
            fallback_detail(&event.payload),
        )),
    }
}

/// Read a payload field as display text. Strings pass through, numbers are
/// formatted; anything else is ignored.
fn field(payload: &Value, key: &str) -> Option<String> {
    match payload.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Detail text for the catch-all rule: objects are stringified and
/// truncated, everything else stringified directly, null omitted.
fn fallback_detail(payload: &Value) -> Option<String> {
    match payload {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Object(_) | Value::Array(_) => serde_json::to_string(payload)
            .ok()
            .map(|s| truncate(&s, MAX_DETAIL_LEN)),
        other => Some(other.to_string()),
    }
}

/// Truncate to `max` characters, appending an ellipsis when shortened.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_owned();
    }
    let mut out: String = s.chars().take(max).collect();
    out.push('…');
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
