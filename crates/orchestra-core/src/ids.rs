//! Newtype identifiers, matching the teacher's `steer-workspace/src/lib.rs`
//! style (`EnvironmentId`/`WorkspaceId`/`RepoId`, each a tuple struct
//! wrapping a `Uuid`) of wrapping a `Uuid` per logical identifier rather than
//! passing bare strings around.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($name:ident, $version:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::$version())
            }

            pub fn from_string(s: &str) -> Option<Self> {
                Uuid::parse_str(s).ok().map(Self)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(SessionId, new_v7);
uuid_id!(PromptId, new_v7);
uuid_id!(OpId, new_v4);

/// Tool-call identifiers are supplied by the model (or a slash-command) as
/// plain strings, not generated locally, so this wraps a `String` rather than
/// a `Uuid` — the model's own identifier is the source of truth and must
/// round-trip exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolCallId(pub String);

impl ToolCallId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ToolCallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ToolCallId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ToolCallId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
