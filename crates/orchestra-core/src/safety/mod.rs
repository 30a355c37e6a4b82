//! C5: Safety & Policy Gate. Path resolution, command classification, loop
//! detection, and quota/model fallback — everything that stands between a
//! model-proposed tool call and its execution, grounded on the teacher's
//! `app/validation.rs` (`ToolValidator`/`ValidatorRegistry`/`BashValidator`)
//! and `utils/paths.rs`.

pub mod command;
pub mod fallback;
pub mod loop_detect;
pub mod path_resolve;

use thiserror::Error;

pub use command::{CommandClassification, CommandClassifier};
pub use fallback::{FallbackDecision, FallbackHandler};
pub use loop_detect::{LoopDetector, OrchestratorState};
pub use path_resolve::{resolve_path, PathResolution};

/// Errors raised by the safety gate. These cross into
/// [`crate::error::OrchestratorError`] via `#[from]` only when a turn must
/// abort; ordinary per-call failures (e.g. an ambiguous path) are instead
/// folded into a tool's own [`orchestra_tools::ToolError`] so the model can
/// see and react to them.
#[derive(Debug, Error)]
pub enum SafetyError {
    #[error("path resolution failed: {0}")]
    PathResolution(#[from] orchestra_tools::ToolError),

    #[error("command classification failed to parse shell input: {0}")]
    CommandParse(String),

    #[error("loop detected: fingerprint {fingerprint} repeated {count} times in state {state}")]
    LoopDetected {
        fingerprint: String,
        count: usize,
        state: String,
    },
}
