//! Tool outputs. Every `ToolResult` carries both a model-facing structured
//! form (via `llm_format`) and enough structure for a human-facing display
//! (plain text, a diff, or an opaque MCP-style payload) — the two
//! representations spec §6 requires of every tool response.

use serde::{Deserialize, Serialize};

use crate::error::ToolError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ToolResult {
    Read(ReadResult),
    Edit(EditResult),
    Bash(BashResult),
    Search(SearchResult),
    Think(ThinkResult),
    External(ExternalResult),
    Error(ToolError),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadResult {
    pub path: String,
    pub content: String,
    pub truncated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EditResult {
    pub path: String,
    pub file_created: bool,
    pub changes_made: usize,
    /// Unified diff, used both as the approval proposal and the display form.
    pub diff: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BashResult {
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchMatch {
    pub path: String,
    pub line_number: u64,
    pub line_content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub pattern: String,
    pub matches: Vec<SearchMatch>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThinkResult {
    pub thought: String,
}

/// Opaque payload for a remote (MCP-like) tool this crate does not know the
/// concrete shape of.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExternalResult {
    pub tool_name: String,
    pub payload: String,
}

impl From<ReadResult> for ToolResult {
    fn from(r: ReadResult) -> Self {
        Self::Read(r)
    }
}
impl From<EditResult> for ToolResult {
    fn from(r: EditResult) -> Self {
        Self::Edit(r)
    }
}
impl From<BashResult> for ToolResult {
    fn from(r: BashResult) -> Self {
        Self::Bash(r)
    }
}
impl From<SearchResult> for ToolResult {
    fn from(r: SearchResult) -> Self {
        Self::Search(r)
    }
}
impl From<ThinkResult> for ToolResult {
    fn from(r: ThinkResult) -> Self {
        Self::Think(r)
    }
}
impl From<ExternalResult> for ToolResult {
    fn from(r: ExternalResult) -> Self {
        Self::External(r)
    }
}
impl From<ToolError> for ToolResult {
    fn from(e: ToolError) -> Self {
        Self::Error(e)
    }
}

impl ToolResult {
    pub fn is_error(&self) -> bool {
        matches!(self, ToolResult::Error(_))
    }

    /// The model-facing structured form. This is what gets embedded into a
    /// `functionResponse` part and sent back to the model.
    pub fn llm_format(&self) -> String {
        match self {
            ToolResult::Read(r) => r.content.clone(),
            ToolResult::Edit(r) => {
                if r.file_created {
                    format!("created {}", r.path)
                } else {
                    format!("edited {}: {} change(s)", r.path, r.changes_made)
                }
            }
            ToolResult::Bash(r) => {
                let mut out = r.stdout.clone();
                if r.exit_code != 0 {
                    if !out.is_empty() && !out.ends_with('\n') {
                        out.push('\n');
                    }
                    out.push_str(&format!("exit code: {}", r.exit_code));
                    if !r.stderr.is_empty() {
                        out.push_str(&format!("\nstderr:\n{}", r.stderr));
                    }
                }
                out
            }
            ToolResult::Search(r) => {
                if r.matches.is_empty() {
                    "no matches found".to_string()
                } else {
                    r.matches
                        .iter()
                        .map(|m| format!("{}:{}: {}", m.path, m.line_number, m.line_content))
                        .collect::<Vec<_>>()
                        .join("\n")
                }
            }
            ToolResult::Think(r) => r.thought.clone(),
            ToolResult::External(r) => r.payload.clone(),
            ToolResult::Error(e) => format!("error: {e}"),
        }
    }

    /// Human-facing display representation, typed per spec §6: plain text,
    /// a unified diff, or an opaque structured payload.
    pub fn display(&self) -> Display<'_> {
        match self {
            ToolResult::Edit(r) => Display::Diff(&r.diff),
            ToolResult::External(r) => Display::Structured(&r.payload),
            other => Display::Text(other.llm_format()),
        }
    }
}

pub enum Display<'a> {
    Text(String),
    Diff(&'a str),
    Structured(&'a str),
}
