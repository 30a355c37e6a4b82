//! Concrete builtin tools, one module per [`super::invocation::Kind`]
//! variant with an observable side effect. Each implements [`super::Tool`]
//! directly; the registry stores them erased.

mod bash;
mod edit;
mod grep;
mod read_file;
mod think;

pub use bash::BashTool;
pub use edit::{apply_replacement, EditParams, EditTool, MatchMode};
pub use grep::GrepTool;
pub use read_file::ReadFileTool;
pub use think::ThinkTool;
