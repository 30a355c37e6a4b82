//! The `grep` tool: regex search over workspace files. Grounded on the
//! teacher's search-tool shape (`SearchResult`/`SearchMatch` in
//! `orchestra-tools::result`) with the walk pared down to `glob`, since this
//! crate does not depend on the teacher's `ignore` crate (dropped — see
//! DESIGN.md).

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use orchestra_tools::{InputSchema, SearchMatch, SearchResult, ToolError};

use crate::tools::capability::Capabilities;
use crate::tools::invocation::{Kind, Tool, ToolContext};

const SKIP_DIRS: &[&str] = &[".git", "node_modules", "target", ".venv", "vendor"];
const MAX_MATCHES: usize = 500;

pub struct GrepTool;

#[derive(Debug, Deserialize)]
pub struct GrepParams {
    pub pattern: String,
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GrepOutput(pub SearchResult);

impl From<GrepOutput> for orchestra_tools::ToolResult {
    fn from(o: GrepOutput) -> Self {
        o.0.into()
    }
}

fn walk(root: &std::path::Path, matches: &mut Vec<std::path::PathBuf>) {
    let Ok(entries) = std::fs::read_dir(root) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name() else { continue };
        if path.is_dir() {
            if !SKIP_DIRS.contains(&name.to_string_lossy().as_ref()) {
                walk(&path, matches);
            }
        } else {
            matches.push(path);
        }
    }
}

#[async_trait]
impl Tool for GrepTool {
    type Params = GrepParams;
    type Output = GrepOutput;

    const NAME: &'static str = "grep";
    const DESCRIPTION: &'static str = "Search workspace files for a regex pattern.";
    const KIND: Kind = Kind::Search;
    const REQUIRES_APPROVAL: bool = false;
    const REQUIRED_CAPABILITIES: Capabilities = Capabilities::WORKSPACE;

    fn input_schema(&self) -> InputSchema {
        let mut props = serde_json::Map::new();
        props.insert("pattern".to_string(), serde_json::json!({"type": "string"}));
        props.insert("path".to_string(), serde_json::json!({"type": "string"}));
        InputSchema::object(props, vec!["pattern".to_string()])
    }

    async fn execute(&self, params: Self::Params, ctx: &ToolContext) -> Result<Self::Output, ToolError> {
        let regex = Regex::new(&params.pattern)
            .map_err(|e| ToolError::invalid_params(Self::NAME, e.to_string()))?;

        let search_root = match &params.path {
            Some(p) => ctx.workspace_root.join(p),
            None => ctx.workspace_root.clone(),
        };

        let mut files = Vec::new();
        walk(&search_root, &mut files);

        let mut matches = Vec::new();
        'files: for path in files {
            let Ok(content) = std::fs::read_to_string(&path) else {
                continue;
            };
            for (idx, line) in content.lines().enumerate() {
                if regex.is_match(line) {
                    matches.push(SearchMatch {
                        path: path.display().to_string(),
                        line_number: (idx + 1) as u64,
                        line_content: line.to_string(),
                    });
                    if matches.len() >= MAX_MATCHES {
                        break 'files;
                    }
                }
            }
        }

        Ok(GrepOutput(SearchResult {
            pattern: params.pattern,
            matches,
        }))
    }
}
