//! The `edit_file` tool: an exact-match string replacement with a required
//! uniqueness check, grounded on the teacher's `EditTool`/`EditParams`
//! contract (`tools/builtin_tools/edit.rs`) — `old_string` must identify a
//! single location unless `match_mode` says otherwise, and the result
//! carries a unified diff for the approval/display path (spec §6).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use similar::TextDiff;

use orchestra_tools::{EditResult, InputSchema, ToolError};

use crate::safety::resolve_path;
use crate::tools::capability::Capabilities;
use crate::tools::invocation::{Kind, Tool, ToolContext};

pub struct EditTool;

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    ExactlyOne,
    First,
    All,
    Nth,
}

impl Default for MatchMode {
    fn default() -> Self {
        Self::ExactlyOne
    }
}

#[derive(Debug, Deserialize)]
pub struct EditParams {
    pub path: String,
    pub old_string: String,
    pub new_string: String,
    #[serde(default)]
    pub match_mode: MatchMode,
    pub match_index: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct EditOutput(pub EditResult);

impl From<EditOutput> for orchestra_tools::ToolResult {
    fn from(o: EditOutput) -> Self {
        o.0.into()
    }
}

/// Replace occurrences of `old_string` in `content` per `mode`. Pure so it
/// can be exercised (and proven idempotent) without touching the filesystem.
pub fn apply_replacement(
    content: &str,
    old_string: &str,
    new_string: &str,
    mode: MatchMode,
    match_index: Option<usize>,
) -> Result<(String, usize), ToolError> {
    if old_string.is_empty() {
        return Err(ToolError::invalid_params(
            EditTool::NAME,
            "old_string must be non-empty",
        ));
    }

    let occurrences: Vec<usize> = content.match_indices(old_string).map(|(i, _)| i).collect();
    if occurrences.is_empty() {
        return Err(ToolError::execution(
            EditTool::NAME,
            "old_string not found in file",
        ));
    }

    let selected: Vec<usize> = match mode {
        MatchMode::ExactlyOne => {
            if occurrences.len() != 1 {
                return Err(ToolError::execution(
                    EditTool::NAME,
                    format!(
                        "old_string matches {} locations; provide more context or use match_mode",
                        occurrences.len()
                    ),
                ));
            }
            occurrences
        }
        MatchMode::First => vec![occurrences[0]],
        MatchMode::All => occurrences,
        MatchMode::Nth => {
            let index = match_index.ok_or_else(|| {
                ToolError::invalid_params(EditTool::NAME, "match_index is required for match_mode=nth")
            })?;
            let zero_based = index.checked_sub(1).ok_or_else(|| {
                ToolError::invalid_params(EditTool::NAME, "match_index is 1-based")
            })?;
            let offset = occurrences.get(zero_based).ok_or_else(|| {
                ToolError::execution(
                    EditTool::NAME,
                    format!("match_index {index} out of range ({} matches)", occurrences.len()),
                )
            })?;
            vec![*offset]
        }
    };

    let mut result = String::with_capacity(content.len());
    let mut cursor = 0;
    for offset in &selected {
        result.push_str(&content[cursor..*offset]);
        result.push_str(new_string);
        cursor = offset + old_string.len();
    }
    result.push_str(&content[cursor..]);

    Ok((result, selected.len()))
}

#[async_trait]
impl Tool for EditTool {
    type Params = EditParams;
    type Output = EditOutput;

    const NAME: &'static str = "edit_file";
    const DESCRIPTION: &'static str = "Replace an exact substring in a file. old_string must uniquely identify a single location unless match_mode is set. Include enough surrounding context (3-5 lines) to disambiguate.";
    const KIND: Kind = Kind::Edit;
    const REQUIRES_APPROVAL: bool = true;
    const REQUIRED_CAPABILITIES: Capabilities = Capabilities::WORKSPACE;

    fn input_schema(&self) -> InputSchema {
        let mut props = serde_json::Map::new();
        props.insert("path".to_string(), serde_json::json!({"type": "string"}));
        props.insert("old_string".to_string(), serde_json::json!({"type": "string"}));
        props.insert("new_string".to_string(), serde_json::json!({"type": "string"}));
        props.insert(
            "match_mode".to_string(),
            serde_json::json!({"type": "string", "enum": ["exactly_one", "first", "all", "nth"]}),
        );
        props.insert("match_index".to_string(), serde_json::json!({"type": "integer"}));
        InputSchema::object(
            props,
            vec!["path".to_string(), "old_string".to_string(), "new_string".to_string()],
        )
    }

    async fn execute(&self, params: Self::Params, ctx: &ToolContext) -> Result<Self::Output, ToolError> {
        let resolution = resolve_path(&params.path, &ctx.workspace_root)?;
        let original = tokio::fs::read_to_string(&resolution.absolute)
            .await
            .map_err(|e| ToolError::Io {
                tool_name: Self::NAME.to_string(),
                message: e.to_string(),
            })?;

        let (updated, changes_made) = apply_replacement(
            &original,
            &params.old_string,
            &params.new_string,
            params.match_mode,
            params.match_index,
        )?;

        let diff = TextDiff::from_lines(&original, &updated)
            .unified_diff()
            .context_radius(3)
            .header(&params.path, &params.path)
            .to_string();

        tokio::fs::write(&resolution.absolute, &updated)
            .await
            .map_err(|e| ToolError::Io {
                tool_name: Self::NAME.to_string(),
                message: e.to_string(),
            })?;

        Ok(EditOutput(EditResult {
            path: params.path,
            file_created: false,
            changes_made,
            diff,
        }))
    }
}
