//! Typed view over namespaced push-event names.
//!
//! Event names arrive as strings; [`PushEvent::from_name`] parses them into
//! a sum type so classification is an exhaustive match instead of scattered
//! string comparisons. Parsing applies the classifier's precedence: lifecycle
//! shapes first, then exact control names, then noise, then the fallback.

/// Phase suffix of an `agent.<slug>.<phase>` lifecycle event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentPhase {
    /// The agent started executing a step.
    Running,
    /// The agent finished its step.
    Completed,
}

/// Phase suffix of a `workflow.<name>.<phase>` lifecycle event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkflowPhase {
    /// A workflow run began.
    Started,
    /// A workflow run finished.
    Completed,
}

/// A parsed push-event name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PushEvent {
    /// `agent.<slug>.running` / `agent.<slug>.completed`.
    AgentLifecycle {
        /// Agent slug (middle segments, joined if the slug contains dots).
        slug: String,
        /// Lifecycle phase.
        phase: AgentPhase,
    },
    /// `workflow.<name>.started` / `workflow.<name>.completed`.
    WorkflowLifecycle {
        /// Workflow name.
        name: String,
        /// Lifecycle phase.
        phase: WorkflowPhase,
    },
    /// `workflow.approval_needed` — a run paused at a human approval gate.
    WorkflowApprovalNeeded,
    /// `approval.requested` — an agent action awaiting explicit approval.
    ApprovalRequested,
    /// Connectivity/keepalive signals and unnamed frames; never displayed.
    Noise,
    /// Any other event name; degrades gracefully instead of being dropped.
    Other {
        /// The unparsed event name.
        name: String,
    },
}

impl PushEvent {
    /// Parse an event name. First match wins, in classifier order.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        if let Some(event) = parse_lifecycle(name) {
            return event;
        }
        match name {
            "workflow.approval_needed" => Self::WorkflowApprovalNeeded,
            "approval.requested" => Self::ApprovalRequested,
            "" | "ping" | "pong" | "client.ping" => Self::Noise,
            other => Self::Other {
                name: other.to_owned(),
            },
        }
    }
}

/// Match `<domain>.<identifier>.<phase>` lifecycle names.
///
/// The identifier may itself contain dots; the phase is always the last
/// segment.
fn parse_lifecycle(name: &str) -> Option<PushEvent> {
    let (domain, rest) = name.split_once('.')?;
    let (identifier, phase) = rest.rsplit_once('.')?;
    if identifier.is_empty() {
        return None;
    }
    match (domain, phase) {
        ("agent", "running") => Some(PushEvent::AgentLifecycle {
            slug: identifier.to_owned(),
            phase: AgentPhase::Running,
        }),
        ("agent", "completed") => Some(PushEvent::AgentLifecycle {
            slug: identifier.to_owned(),
            phase: AgentPhase::Completed,
        }),
        ("workflow", "started") => Some(PushEvent::WorkflowLifecycle {
            name: identifier.to_owned(),
            phase: WorkflowPhase::Started,
        }),
        ("workflow", "completed") => Some(PushEvent::WorkflowLifecycle {
            name: identifier.to_owned(),
            phase: WorkflowPhase::Completed,
        }),
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
