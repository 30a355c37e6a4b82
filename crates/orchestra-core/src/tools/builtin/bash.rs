//! The `bash` tool: runs a shell command under the workspace root through
//! the process's default shell. Grounded on the teacher's `tools/bash.rs`
//! shape (command/stdout/stderr/exit_code) and on `safety::command` for
//! the dangerous-pattern gate that blocks execution outright rather than
//! deferring to approval, since spec §5 treats those as non-negotiable.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};

use orchestra_tools::{BashResult, InputSchema, ToolError};

use crate::safety::CommandClassifier;
use crate::tools::capability::Capabilities;
use crate::tools::invocation::{Kind, Tool, ToolContext};

pub struct BashTool;

#[derive(Debug, Deserialize)]
pub struct BashParams {
    pub command: String,
}

#[derive(Debug, Serialize)]
pub struct BashOutput(pub BashResult);

impl From<BashOutput> for orchestra_tools::ToolResult {
    fn from(o: BashOutput) -> Self {
        o.0.into()
    }
}

#[async_trait]
impl Tool for BashTool {
    type Params = BashParams;
    type Output = BashOutput;

    const NAME: &'static str = "bash";
    const DESCRIPTION: &'static str = "Run a shell command in the workspace.";
    const KIND: Kind = Kind::Exec;
    const REQUIRES_APPROVAL: bool = true;
    const REQUIRED_CAPABILITIES: Capabilities = Capabilities::WORKSPACE.union(Capabilities::PROCESS_SPAWN);

    fn input_schema(&self) -> InputSchema {
        let mut props = serde_json::Map::new();
        props.insert("command".to_string(), serde_json::json!({"type": "string"}));
        InputSchema::object(props, vec!["command".to_string()])
    }

    async fn execute(&self, params: Self::Params, ctx: &ToolContext) -> Result<Self::Output, ToolError> {
        if CommandClassifier::is_dangerous(&params.command) {
            return Err(ToolError::PolicyBlocked {
                command: params.command.clone(),
                reason: "matches a command pattern that is never auto-approved".to_string(),
            });
        }

        // `kill_on_drop` means the blanket `ErasedTool::invoke` race against
        // `ctx.cancellation` (see invocation.rs) reaps this child the moment
        // cancellation wins: no separate select needed here.
        let mut child = tokio::process::Command::new("/bin/sh")
            .arg("-c")
            .arg(&params.command)
            .current_dir(&ctx.workspace_root)
            .kill_on_drop(true)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| ToolError::Io {
                tool_name: Self::NAME.to_string(),
                message: e.to_string(),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| ToolError::Io {
            tool_name: Self::NAME.to_string(),
            message: "failed to capture stdout".to_string(),
        })?;
        let mut stderr = child.stderr.take().ok_or_else(|| ToolError::Io {
            tool_name: Self::NAME.to_string(),
            message: "failed to capture stderr".to_string(),
        })?;

        // stderr is read to completion in the background while stdout is
        // streamed line by line, forwarding each line to the scheduler's
        // output-chunk sink as it arrives (spec §4.1/§4.2 artifact-update).
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            stderr.read_to_end(&mut buf).await.map(|_| buf)
        });

        let mut stdout_buf = String::new();
        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await.map_err(|e| ToolError::Io {
            tool_name: Self::NAME.to_string(),
            message: e.to_string(),
        })? {
            ctx.emit_output_chunk(format!("{line}\n"));
            stdout_buf.push_str(&line);
            stdout_buf.push('\n');
        }

        let status = child.wait().await.map_err(|e| ToolError::Io {
            tool_name: Self::NAME.to_string(),
            message: e.to_string(),
        })?;
        let stderr_bytes = stderr_task.await.unwrap_or(Ok(Vec::new())).unwrap_or_default();

        Ok(BashOutput(BashResult {
            command: params.command,
            stdout: stdout_buf,
            stderr: String::from_utf8_lossy(&stderr_bytes).into_owned(),
            exit_code: status.code().unwrap_or(-1),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::invocation::ErasedTool;

    #[tokio::test]
    async fn runs_a_simple_command() {
        let ctx = ToolContext::new(std::env::temp_dir(), tokio_util::sync::CancellationToken::new());
        let result = BashTool
            .invoke(serde_json::json!({"command": "echo hi"}), &ctx)
            .await
            .unwrap();
        assert_eq!(result.llm_format().trim(), "hi");
    }

    #[tokio::test]
    async fn streams_each_line_to_the_output_chunk_sink() {
        let chunks = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let recorded = chunks.clone();
        let ctx = ToolContext::new(std::env::temp_dir(), tokio_util::sync::CancellationToken::new())
            .with_output_chunk(std::sync::Arc::new(move |chunk: String| {
                recorded.lock().unwrap_or_else(std::sync::PoisonError::into_inner).push(chunk);
            }));
        let result = BashTool
            .invoke(serde_json::json!({"command": "printf 'one\\ntwo\\n'"}), &ctx)
            .await
            .unwrap();
        assert_eq!(result.llm_format().trim(), "one\ntwo");
        assert_eq!(*chunks.lock().unwrap_or_else(std::sync::PoisonError::into_inner), vec!["one\n", "two\n"]);
    }

    #[tokio::test]
    async fn blocks_dangerous_command_before_spawning() {
        let ctx = ToolContext::new(std::env::temp_dir(), tokio_util::sync::CancellationToken::new());
        let result = BashTool
            .invoke(serde_json::json!({"command": "rm -rf /"}), &ctx)
            .await
            .unwrap();
        assert!(matches!(result, orchestra_tools::ToolResult::Error(ToolError::PolicyBlocked { .. })));
    }

    #[tokio::test]
    async fn cancellation_stops_a_long_running_command_promptly() {
        let token = tokio_util::sync::CancellationToken::new();
        let ctx = ToolContext::new(std::env::temp_dir(), token.clone());

        let call = tokio::spawn(async move {
            BashTool
                .invoke(serde_json::json!({"command": "sleep 30"}), &ctx)
                .await
        });

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        token.cancel();

        let result = tokio::time::timeout(std::time::Duration::from_secs(5), call)
            .await
            .expect("bash tool did not return promptly after cancellation")
            .expect("task panicked");

        assert!(matches!(result, Err(ToolError::Cancelled(_))));
    }
}
