//! C1: the typed `Tool` trait every builtin tool implements, plus the
//! object-safe `ErasedTool` wrapper the registry actually stores. Grounded
//! on the teacher's `tools/static_tool.rs` (`StaticTool` /
//! `StaticToolErased` / blanket impl performing the JSON boundary
//! conversion), generalized so a single erased type also covers non-static
//! (remote/MCP-shaped) tools via [`ExternalTool`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use orchestra_tools::{InputSchema, ToolError, ToolResult};

use super::capability::Capabilities;

/// Execution context handed to every tool invocation: the workspace root, a
/// token the tool must poll (or select against) during long-running work,
/// and an optional sink for incremental output (spec §4.1 `on_output_chunk`)
/// a tool may call any number of times before it returns.
#[derive(Clone)]
pub struct ToolContext {
    pub workspace_root: std::path::PathBuf,
    pub cancellation: CancellationToken,
    pub on_output_chunk: Option<Arc<dyn Fn(String) + Send + Sync>>,
}

impl ToolContext {
    pub fn new(workspace_root: std::path::PathBuf, cancellation: CancellationToken) -> Self {
        Self { workspace_root, cancellation, on_output_chunk: None }
    }

    #[must_use]
    pub fn with_output_chunk(mut self, f: Arc<dyn Fn(String) + Send + Sync>) -> Self {
        self.on_output_chunk = Some(f);
        self
    }

    /// Forward a chunk of incremental tool output, if a sink is attached.
    /// A no-op for tools invoked without one (e.g. most unit tests).
    pub fn emit_output_chunk(&self, chunk: impl Into<String>) {
        if let Some(sink) = &self.on_output_chunk {
            sink(chunk.into());
        }
    }
}

/// The kind of side effect a tool performs, used by the scheduler to decide
/// concurrency and path-locking policy (spec §5) and by the safety gate to
/// pick loop-detection thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Read,
    Edit,
    Exec,
    Search,
    Think,
    Other,
}

/// Typed tool definition. Implementors describe their contract through
/// associated types; [`ErasedTool`] is what the registry actually stores,
/// via the blanket impl below.
#[async_trait]
pub trait Tool: Send + Sync + 'static {
    type Params: DeserializeOwned + Send;
    type Output: Serialize + Into<ToolResult> + Send;

    const NAME: &'static str;
    const DESCRIPTION: &'static str;
    const KIND: Kind;
    const REQUIRES_APPROVAL: bool;
    const REQUIRED_CAPABILITIES: Capabilities;

    fn input_schema(&self) -> InputSchema;

    async fn execute(&self, params: Self::Params, ctx: &ToolContext) -> Result<Self::Output, ToolError>;
}

/// Object-safe counterpart of [`Tool`], storable as `Arc<dyn ErasedTool>` in
/// the registry. Every [`Tool`] gets this for free via the blanket impl.
#[async_trait]
pub trait ErasedTool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn kind(&self) -> Kind;
    fn requires_approval(&self) -> bool;
    fn required_capabilities(&self) -> Capabilities;
    fn input_schema(&self) -> InputSchema;

    async fn invoke(&self, params: serde_json::Value, ctx: &ToolContext) -> Result<ToolResult, ToolError>;
}

#[async_trait]
impl<T> ErasedTool for T
where
    T: Tool,
{
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn description(&self) -> &'static str {
        T::DESCRIPTION
    }

    fn kind(&self) -> Kind {
        T::KIND
    }

    fn requires_approval(&self) -> bool {
        T::REQUIRES_APPROVAL
    }

    fn required_capabilities(&self) -> Capabilities {
        T::REQUIRED_CAPABILITIES
    }

    fn input_schema(&self) -> InputSchema {
        Tool::input_schema(self)
    }

    async fn invoke(&self, params: serde_json::Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        if ctx.cancellation.is_cancelled() {
            return Err(ToolError::Cancelled(T::NAME.to_string()));
        }
        let parsed: T::Params = serde_json::from_value(params)
            .map_err(|e| ToolError::invalid_params(T::NAME, e.to_string()))?;

        // Spec §4.1/§7: execution failures are *recovered locally* into a
        // `ToolResult` whose `is_error` flag is set, not propagated as
        // `Err` — only a boundary failure (cancellation, malformed JSON
        // above) aborts the call outright.
        tokio::select! {
            biased;
            () = ctx.cancellation.cancelled() => Err(ToolError::Cancelled(T::NAME.to_string())),
            result = self.execute(parsed, ctx) => Ok(match result {
                Ok(output) => output.into(),
                Err(e) => ToolResult::Error(e),
            }),
        }
    }
}

pub type ArcTool = Arc<dyn ErasedTool>;
