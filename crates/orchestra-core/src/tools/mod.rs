//! C1: Tool Registry & Invocation.

pub mod builtin;
pub mod capability;
pub mod invocation;
pub mod registry;

pub use capability::Capabilities;
pub use invocation::{ArcTool, ErasedTool, Kind, Tool, ToolContext};
pub use registry::{ExternalBackend, ToolRegistry};
