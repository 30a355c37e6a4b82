//! The `read_file` tool. Grounded on the teacher's `ToolExecutor::execute_tool_direct`
//! dispatch for read-shaped static tools, and on `safety::path_resolve` for
//! the path-containment guarantee every file tool shares.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use orchestra_tools::{InputSchema, ReadResult, ToolError};

use crate::safety::resolve_path;
use crate::tools::capability::Capabilities;
use crate::tools::invocation::{Kind, Tool, ToolContext};

/// Content past this length is truncated with a marker, mirroring the
/// teacher's `ToolResult::llm_format` truncation behavior for oversized
/// Bash output, applied here to file reads.
const MAX_CONTENT_BYTES: usize = 256 * 1024;

pub struct ReadFileTool;

#[derive(Debug, Deserialize)]
pub struct ReadFileParams {
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct ReadFileOutput(pub ReadResult);

impl From<ReadFileOutput> for orchestra_tools::ToolResult {
    fn from(o: ReadFileOutput) -> Self {
        o.0.into()
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    type Params = ReadFileParams;
    type Output = ReadFileOutput;

    const NAME: &'static str = "read_file";
    const DESCRIPTION: &'static str = "Read the contents of a file in the workspace.";
    const KIND: Kind = Kind::Read;
    const REQUIRES_APPROVAL: bool = false;
    const REQUIRED_CAPABILITIES: Capabilities = Capabilities::WORKSPACE;

    fn input_schema(&self) -> InputSchema {
        let mut props = serde_json::Map::new();
        props.insert("path".to_string(), serde_json::json!({"type": "string"}));
        InputSchema::object(props, vec!["path".to_string()])
    }

    async fn execute(&self, params: Self::Params, ctx: &ToolContext) -> Result<Self::Output, ToolError> {
        let resolution = resolve_path(&params.path, &ctx.workspace_root)?;
        let bytes = tokio::fs::read(&resolution.absolute)
            .await
            .map_err(|e| ToolError::Io {
                tool_name: Self::NAME.to_string(),
                message: e.to_string(),
            })?;

        let (content, truncated) = if bytes.len() > MAX_CONTENT_BYTES {
            let mut s = String::from_utf8_lossy(&bytes[..MAX_CONTENT_BYTES]).into_owned();
            s.push_str("\n... [truncated]");
            (s, true)
        } else {
            (String::from_utf8_lossy(&bytes).into_owned(), false)
        };

        Ok(ReadFileOutput(ReadResult {
            path: params.path,
            content,
            truncated,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::invocation::ErasedTool;
    use tempfile::TempDir;

    #[tokio::test]
    async fn reads_file_contents() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "hello").unwrap();
        let ctx = ToolContext::new(dir.path().to_path_buf(), tokio_util::sync::CancellationToken::new());
        let result = ReadFileTool
            .invoke(serde_json::json!({"path": "a.txt"}), &ctx)
            .await
            .unwrap();
        assert_eq!(result.llm_format(), "hello");
    }

    #[tokio::test]
    async fn rejects_path_outside_workspace() {
        let dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "nope").unwrap();
        let ctx = ToolContext::new(dir.path().to_path_buf(), tokio_util::sync::CancellationToken::new());
        let path = outside.path().join("secret.txt");
        let result = ReadFileTool
            .invoke(serde_json::json!({"path": path.to_str().unwrap()}), &ctx)
            .await
            .unwrap();
        assert!(matches!(result, orchestra_tools::ToolResult::Error(ToolError::PathNotInWorkspace { .. })));
    }
}
