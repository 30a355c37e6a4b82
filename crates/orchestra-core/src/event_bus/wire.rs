//! The A2A-flavored wire envelope (spec §6): the shape an [`Event`] is
//! serialized to when crossing a process boundary (SSE stream, webhook).
//! Grounded on the teacher's `a2a` module, which already speaks this
//! envelope for its own agent-to-agent transport.

use serde::{Deserialize, Serialize};

use super::{Event, SessionState};
use crate::ids::{PromptId, SessionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WireState {
    Submitted,
    Working,
    InputRequired,
    Completed,
    Failed,
    Canceled,
}

impl From<SessionState> for WireState {
    fn from(s: SessionState) -> Self {
        match s {
            SessionState::Submitted => WireState::Submitted,
            SessionState::Working => WireState::Working,
            SessionState::InputRequired => WireState::InputRequired,
            SessionState::Completed => WireState::Completed,
            SessionState::Failed => WireState::Failed,
            SessionState::Canceled => WireState::Canceled,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireStatus {
    pub state: WireState,
    pub message: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMetadata {
    pub coder_agent: &'static str,
    pub model: Option<String>,
    pub user_tier: Option<String>,
    pub error: Option<String>,
}

/// The envelope actually written to the wire: `{kind, taskId, contextId,
/// status, final, metadata}` (spec §6). Only `StateChange` events cross this
/// boundary today; content/thought/tool events ride the in-process bus only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireEnvelope {
    pub kind: &'static str,
    pub task_id: String,
    pub context_id: String,
    pub status: WireStatus,
    pub r#final: bool,
    pub metadata: WireMetadata,
}

/// Renders a `StateChange` event into the wire envelope; returns `None` for
/// event variants that have no wire representation.
pub fn to_wire_envelope(
    event: &Event,
    session_id: SessionId,
    timestamp: impl Into<String>,
) -> Option<WireEnvelope> {
    match event {
        Event::StateChange { prompt_id, state, message, r#final, metadata } => {
            Some(WireEnvelope {
                kind: "status-update",
                task_id: format_task_id(*prompt_id),
                context_id: session_id.to_string(),
                status: WireStatus {
                    state: (*state).into(),
                    message: message.clone(),
                    timestamp: timestamp.into(),
                },
                r#final: *r#final,
                metadata: WireMetadata {
                    coder_agent: "orchestra",
                    model: metadata.model.clone(),
                    user_tier: metadata.user_tier.clone(),
                    error: metadata.error.clone(),
                },
            })
        }
        _ => None,
    }
}

fn format_task_id(prompt_id: PromptId) -> String {
    prompt_id.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::StateChangeMetadata;

    #[test]
    fn state_change_renders_to_wire_envelope() {
        let event = Event::StateChange {
            prompt_id: PromptId::new(),
            state: SessionState::Completed,
            message: Some("done".to_string()),
            r#final: true,
            metadata: StateChangeMetadata { model: Some("m".to_string()), user_tier: None, error: None },
        };
        let envelope = to_wire_envelope(&event, SessionId::new(), "2026-07-26T00:00:00Z").unwrap();
        assert_eq!(envelope.kind, "status-update");
        assert!(envelope.r#final);
        assert!(matches!(envelope.status.state, WireState::Completed));
    }

    #[test]
    fn content_event_has_no_wire_representation() {
        let event = Event::Content { prompt_id: PromptId::new(), text: "x".to_string() };
        assert!(to_wire_envelope(&event, SessionId::new(), "t").is_none());
    }
}
