//! C1: the Tool Registry. Holds every builtin tool the runtime knows about
//! plus any externally-registered (MCP-like) backends, and answers the two
//! questions the rest of the orchestrator needs: "what tools exist" (for the
//! model-facing schema list) and "does this call require approval". Grounded
//! on the teacher's `tools/registry.rs::ToolRegistry`.

use std::collections::HashMap;

use orchestra_tools::{ToolCall, ToolError, ToolSchema};

use super::capability::Capabilities;
use super::invocation::{ArcTool, ErasedTool, Kind, ToolContext};

/// An externally-registered tool backend (e.g. an MCP server) that the
/// registry knows the schema of but dispatches to out-of-process. This
/// crate does not implement a transport; [`ExternalBackend`] is the seam a
/// caller plugs one into.
#[async_trait::async_trait]
pub trait ExternalBackend: Send + Sync {
    fn server_name(&self) -> &str;
    fn schemas(&self) -> Vec<ToolSchema>;
    async fn invoke(
        &self,
        call: &ToolCall,
        ctx: &ToolContext,
    ) -> Result<orchestra_tools::ToolResult, ToolError>;
}

#[derive(Default)]
pub struct ToolRegistry {
    builtins: HashMap<String, ArcTool>,
    externals: Vec<std::sync::Arc<dyn ExternalBackend>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_builtin(&mut self, tool: ArcTool) {
        self.builtins.insert(tool.name().to_string(), tool);
    }

    pub fn register_external(&mut self, backend: std::sync::Arc<dyn ExternalBackend>) {
        self.externals.push(backend);
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        self.builtins.contains_key(name)
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.builtins.contains_key(name) || self.find_external(name).is_some()
    }

    pub fn builtin(&self, name: &str) -> Option<&ArcTool> {
        self.builtins.get(name)
    }

    fn find_external(&self, name: &str) -> Option<&std::sync::Arc<dyn ExternalBackend>> {
        self.externals
            .iter()
            .find(|backend| backend.schemas().iter().any(|s| s.name == name))
    }

    /// Schemas visible to a runtime advertising `runtime_caps`. Builtins
    /// whose required capabilities are not satisfied are silently omitted —
    /// the model is never shown a tool it cannot actually call.
    pub fn available_schemas(&self, runtime_caps: Capabilities) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self
            .builtins
            .values()
            .filter(|tool| runtime_caps.satisfies(tool.required_capabilities()))
            .map(|tool| ToolSchema {
                name: tool.name().to_string(),
                display_name: tool.name().to_string(),
                description: tool.description().to_string(),
                input_schema: tool.input_schema(),
            })
            .collect();
        for backend in &self.externals {
            schemas.extend(backend.schemas());
        }
        schemas
    }

    pub fn requires_approval(&self, name: &str) -> Option<bool> {
        self.builtins.get(name).map(|t| t.requires_approval())
    }

    pub fn kind(&self, name: &str) -> Option<Kind> {
        self.builtins.get(name).map(|t| t.kind())
    }

    pub fn required_capabilities(&self, name: &str) -> Option<Capabilities> {
        self.builtins.get(name).map(|t| t.required_capabilities())
    }

    /// Dispatch a call to either a builtin or an external backend.
    pub async fn invoke(
        &self,
        call: &ToolCall,
        ctx: &ToolContext,
    ) -> Result<orchestra_tools::ToolResult, ToolError> {
        if let Some(tool) = self.builtins.get(&call.name) {
            return tool.invoke(call.parameters.clone(), ctx).await;
        }
        if let Some(backend) = self.find_external(&call.name) {
            return backend.invoke(call, ctx).await;
        }
        Err(ToolError::UnknownTool(call.name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::builtin::ThinkTool;

    #[tokio::test]
    async fn unknown_tool_is_reported() {
        let registry = ToolRegistry::new();
        let ctx = ToolContext::new(std::env::temp_dir(), tokio_util::sync::CancellationToken::new());
        let call = ToolCall::new("1", "nonexistent", serde_json::json!({}));
        let err = registry.invoke(&call, &ctx).await.unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(_)));
    }

    #[test]
    fn available_schemas_filters_by_capability() {
        let mut registry = ToolRegistry::new();
        registry.register_builtin(std::sync::Arc::new(ThinkTool));
        let with_nothing = registry.available_schemas(Capabilities::empty());
        assert_eq!(with_nothing.len(), 1, "think requires no capabilities");
    }
}
