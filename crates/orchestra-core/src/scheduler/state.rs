//! Scheduler-owned state for a single tool call (spec §3/§4.5's state
//! machine), grounded on the teacher's `ToolCallStatus`-shaped transitions
//! (`app/domain/action.rs`'s `ApprovalDecision`, `session_actor.rs`'s
//! `active_operations` map) but using the status and outcome vocabulary the
//! turn loop's own contract names, since this is the seam C3 and C2 share.

use orchestra_tools::{ToolCall, ToolResult};

use crate::ids::{OpId, ToolCallId};

/// What a tool intends to do, shown to the user for approval. Each variant
/// carries the human-readable proposal material appropriate to its kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmationDetails {
    Edit { path: String, diff: String },
    ExecCommand { command: String },
    McpServerCall { server_name: String, tool_name: String, summary: String },
    Info { summary: String },
}

/// The user's (or policy's) resolution of an `AwaitingApproval` tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    ProceedOnce,
    ProceedAlwaysForThisTool,
    ProceedAlwaysForThisServer { server_name: String },
    ProceedAlwaysSession,
    Cancel,
    /// The user edited the proposed change before approving it. Carries the
    /// edited call, which re-enters the Invocation factory and re-emits
    /// `AwaitingApproval` — modeled as the explicit `AwaitingReconfirmation`
    /// sub-state spec §9's Open Question resolution calls for, rather than
    /// a hidden "skip next final" flag.
    ModifyWithEditor { revised_call: ToolCall },
}

/// Where a tool call currently sits in its lifecycle (spec §3/§4.5).
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCallStatus {
    Validating,
    /// Approval required and not yet resolved. `details` is `None` only in
    /// the instant between a transition and the confirmation-details
    /// computation; callers never observe it, but it keeps the variant from
    /// needing a second "awaiting-details" state.
    AwaitingApproval { details: ConfirmationDetails },
    /// A human revised the call via `ModifyWithEditor`; must be explicitly
    /// reapproved, never auto-confirmed by approval mode.
    AwaitingReconfirmation { revised_call: ToolCall, details: ConfirmationDetails },
    Scheduled,
    Executing,
    Success { result: ToolResult },
    Error { result: ToolResult },
    Cancelled { reason: String },
}

impl ToolCallStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ToolCallStatus::Success { .. } | ToolCallStatus::Error { .. } | ToolCallStatus::Cancelled { .. }
        )
    }

    pub fn is_awaiting_decision(&self) -> bool {
        matches!(
            self,
            ToolCallStatus::AwaitingApproval { .. } | ToolCallStatus::AwaitingReconfirmation { .. }
        )
    }
}

/// A scheduler-tracked tool call: the model's request, its current
/// lifecycle state, and a monotonically increasing revision for event
/// de-duplication (spec §3).
#[derive(Debug, Clone)]
pub struct TrackedCall {
    pub op_id: OpId,
    pub call_id: ToolCallId,
    pub call: ToolCall,
    pub status: ToolCallStatus,
    pub revision: u64,
}

impl TrackedCall {
    pub fn new(call: ToolCall) -> Self {
        Self {
            op_id: OpId::new(),
            call_id: ToolCallId::new(call.id.clone()),
            call,
            status: ToolCallStatus::Validating,
            revision: 0,
        }
    }

    pub fn transition(&mut self, status: ToolCallStatus) {
        self.status = status;
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses_are_recognized() {
        assert!(ToolCallStatus::Cancelled { reason: "x".into() }.is_terminal());
        assert!(ToolCallStatus::Success { result: ToolResult::Think(orchestra_tools::ThinkResult { thought: "".into() }) }.is_terminal());
        assert!(!ToolCallStatus::Validating.is_terminal());
    }

    #[test]
    fn revision_increments_on_transition() {
        let mut tracked = TrackedCall::new(ToolCall::new("1", "think", serde_json::json!({})));
        assert_eq!(tracked.revision, 0);
        tracked.transition(ToolCallStatus::Scheduled);
        assert_eq!(tracked.revision, 1);
        tracked.transition(ToolCallStatus::Executing);
        assert_eq!(tracked.revision, 2);
    }
}
