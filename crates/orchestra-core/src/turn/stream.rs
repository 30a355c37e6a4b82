//! The model-facing stream contract C3 drives. Grounded on the teacher's
//! `api/provider.rs` `StreamEvent` enum (a tagged union pulled from an SSE
//! response), generalized to a provider-agnostic pull iterator per spec §9
//! ("callback-driven stream consumer → pull-based iterator with explicit
//! `next()`", so a turn can be single-stepped and resumed after tool
//! results without re-entrant callbacks).

use async_trait::async_trait;

use orchestra_tools::{ToolCall, ToolResult};

use crate::ids::ToolCallId;

/// Why the model stopped generating (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    MaxTokens,
    Safety,
    Recitation,
    Language,
    Blocklist,
    ProhibitedContent,
    Spii,
    Other,
    MalformedFunctionCall,
    ImageSafety,
    UnexpectedToolCall,
}

/// A structured stream-level error. `Quota`/`Unauthorized` are broken out
/// from the generic case because the turn loop reacts to them differently
/// (quota triggers the fallback-model consent flow; unauthorized aborts the
/// session outright) — both mirror a variant already in
/// [`crate::error::OrchestratorError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    Quota { model: String },
    Unauthorized,
    Other(String),
}

/// One event pulled from a model stream (spec §4.3 step 3, §6). Every
/// variant here is a turn-ending or turn-continuing signal the loop must
/// handle explicitly — there is no catch-all default arm anywhere this is
/// matched.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Content(String),
    Thought { subject: String, description: String },
    ToolCallRequest(Vec<ToolCall>),
    /// The model itself surfaces that a pending call needs reconfirmation
    /// (e.g. it revised arguments after an earlier rejection).
    ToolCallConfirmation { call_id: String },
    UserCancelled,
    ChatCompressed { original_token_count: u64, new_token_count: u64 },
    Finished(FinishReason),
    Error(StreamError),
    Citation { text: String, source: String },
    LoopDetected,
    MaxSessionTurns,
    ContextWindowWillOverflow { estimated_tokens: u64, remaining_tokens: u64 },
    Retry { attempt: u32, reason: String },
    InvalidStream(String),
}

/// Pull-based model stream: the turn loop calls `next()` once per event and
/// calls `submit_tool_results` exactly once per `ToolCallRequest` batch,
/// after the scheduler reaches quiescence on it, before pulling again.
#[async_trait]
pub trait ModelStream: Send {
    async fn next(&mut self) -> Option<StreamEvent>;

    async fn submit_tool_results(&mut self, results: Vec<(ToolCallId, ToolResult)>);
}

/// A scripted [`ModelStream`] for tests: yields a fixed sequence of events
/// and records submitted tool results for assertions.
pub struct ReplayModelStream {
    events: std::collections::VecDeque<StreamEvent>,
    pub submitted: Vec<Vec<(ToolCallId, ToolResult)>>,
}

impl ReplayModelStream {
    pub fn new(events: Vec<StreamEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
            submitted: Vec::new(),
        }
    }
}

#[async_trait]
impl ModelStream for ReplayModelStream {
    async fn next(&mut self) -> Option<StreamEvent> {
        self.events.pop_front()
    }

    async fn submit_tool_results(&mut self, results: Vec<(ToolCallId, ToolResult)>) {
        self.submitted.push(results);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replay_stream_yields_events_in_order_then_ends() {
        let mut stream = ReplayModelStream::new(vec![
            StreamEvent::Content("hi".to_string()),
            StreamEvent::Finished(FinishReason::Stop),
        ]);
        assert_eq!(stream.next().await, Some(StreamEvent::Content("hi".to_string())));
        assert_eq!(stream.next().await, Some(StreamEvent::Finished(FinishReason::Stop)));
        assert_eq!(stream.next().await, None);
    }
}
