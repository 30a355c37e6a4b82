pub mod error;
pub mod result;
pub mod schema;

pub use error::ToolError;
pub use result::ToolResult;
pub use schema::{InputSchema, ToolCall, ToolSchema};
