//! The `think` tool: a no-op side effect that lets the model externalize
//! reasoning as a distinct event-bus entry (spec §4.4, "thought" events)
//! rather than inline assistant text. Grounded on the teacher's
//! `StaticTool` examples (`tools/static_tool.rs` test fixtures) as the
//! simplest possible instance of the trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use orchestra_tools::{InputSchema, ThinkResult, ToolError};

use crate::tools::capability::Capabilities;
use crate::tools::invocation::{Kind, Tool, ToolContext};

pub struct ThinkTool;

#[derive(Debug, Deserialize)]
pub struct ThinkParams {
    pub thought: String,
}

#[derive(Debug, Serialize)]
pub struct ThinkOutput(pub ThinkResult);

impl From<ThinkOutput> for orchestra_tools::ToolResult {
    fn from(o: ThinkOutput) -> Self {
        o.0.into()
    }
}

#[async_trait]
impl Tool for ThinkTool {
    type Params = ThinkParams;
    type Output = ThinkOutput;

    const NAME: &'static str = "think";
    const DESCRIPTION: &'static str =
        "Record a private reasoning step without taking any external action.";
    const KIND: Kind = Kind::Think;
    const REQUIRES_APPROVAL: bool = false;
    const REQUIRED_CAPABILITIES: Capabilities = Capabilities::empty();

    fn input_schema(&self) -> InputSchema {
        let mut props = serde_json::Map::new();
        props.insert("thought".to_string(), serde_json::json!({"type": "string"}));
        InputSchema::object(props, vec!["thought".to_string()])
    }

    async fn execute(&self, params: Self::Params, _ctx: &ToolContext) -> Result<Self::Output, ToolError> {
        Ok(ThinkOutput(ThinkResult { thought: params.thought }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::invocation::ErasedTool;

    #[tokio::test]
    async fn think_echoes_its_input() {
        let ctx = ToolContext::new(std::env::temp_dir(), tokio_util::sync::CancellationToken::new());
        let result = ThinkTool
            .invoke(serde_json::json!({"thought": "consider the edge case"}), &ctx)
            .await
            .unwrap();
        assert_eq!(result.llm_format(), "consider the edge case");
    }
}
