use thiserror::Error;

use crate::safety::SafetyError;
use orchestra_tools::ToolError;

pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Crate-wide error type. Tool errors are *recovered locally* by the
/// scheduler (folded into a `ToolCall`'s response, never propagated here);
/// this type is for failures that cross a component boundary and must
/// terminate a turn (spec §7, "Propagation").
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Safety(#[from] SafetyError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("session shutting down")]
    ShuttingDown,

    #[error("internal channel closed")]
    ChannelClosed,

    #[error("credential expired; re-authentication required")]
    UnauthorizedLlm,

    #[error("quota exceeded for model {model}")]
    QuotaExceeded { model: String },

    #[error("loop detected: {fingerprint} recurred {count} times")]
    LoopDetected { fingerprint: String, count: usize },

    #[error("context window would overflow: estimated {estimated}, remaining {remaining}")]
    ContextOverflow { estimated: u64, remaining: u64 },

    #[error("malformed model stream event: {0}")]
    StreamProtocolError(String),

    #[error("cancelled")]
    Cancelled,

    #[error("resume() called with no tool call batch awaiting confirmation")]
    NoPendingToolApproval,
}
