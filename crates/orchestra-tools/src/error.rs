//! Error taxonomy (spec §7) for a single tool call. `ToolError` is a semantic
//! kind tag, not an exception hierarchy: each variant maps to one row of the
//! table in spec.md §7 and carries exactly the policy-relevant payload.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid parameters for {tool_name}: {message}")]
    InvalidParams { tool_name: String, message: String },

    #[error("{tool_name} failed: {message}")]
    Execution { tool_name: String, message: String },

    #[error("{tool_name} io error: {message}")]
    Io { tool_name: String, message: String },

    #[error("file not found: {path}")]
    FileNotFound { path: String },

    #[error("path is ambiguous: {path} matches {candidates} locations")]
    PathAmbiguous { path: String, candidates: usize },

    #[error("path is outside the workspace: {path}")]
    PathNotInWorkspace { path: String },

    #[error("{0} was cancelled")]
    Cancelled(String),

    #[error("command blocked by policy: {command}")]
    PolicyBlocked { command: String, reason: String },

    #[error("internal error: {0}")]
    InternalError(String),
}

impl ToolError {
    pub fn execution(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    pub fn invalid_params(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParams {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    /// True for kinds spec §7 marks as retry-eligible from the model's side
    /// (the model should reformulate its call rather than the orchestrator
    /// retrying automatically).
    pub fn is_retryable_by_model(&self) -> bool {
        matches!(
            self,
            ToolError::FileNotFound { .. }
                | ToolError::PathAmbiguous { .. }
                | ToolError::PathNotInWorkspace { .. }
                | ToolError::InvalidParams { .. }
        )
    }
}
