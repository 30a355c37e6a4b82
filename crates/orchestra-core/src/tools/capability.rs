//! Capability gating: the runtime a tool is invoked under advertises which
//! capabilities it supports, and the registry filters tool availability
//! against that set before a model ever sees the tool's schema. Grounded on
//! the teacher's `tools/capability.rs` bitflags type, renamed to this
//! system's own capability names.

use std::fmt;

bitflags::bitflags! {
    /// Capabilities a runtime environment may support. A tool declares the
    /// capabilities it requires via `Tool::REQUIRED_CAPABILITIES`; the
    /// registry only exposes the tool when the runtime's set is a superset.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u32 {
        /// Local filesystem access rooted at a workspace directory.
        const WORKSPACE     = 0b0000_0001;
        /// Ability to spawn subprocesses (the Exec tool family).
        const PROCESS_SPAWN = 0b0000_0010;
        /// Outbound network access.
        const NETWORK       = 0b0000_0100;
        /// Ability to issue a nested model call (e.g. a summarization tool).
        const MODEL_CALLER  = 0b0000_1000;

        /// Convenience union for tools that only touch the local filesystem.
        const FILE_OPS = Self::WORKSPACE.bits();
        /// Convenience union for a fully-trusted local runtime.
        const FULL_LOCAL = Self::WORKSPACE.bits() | Self::PROCESS_SPAWN.bits();
    }
}

impl Capabilities {
    /// True when `self` (the runtime) provides everything `required` asks
    /// for.
    pub fn satisfies(&self, required: Capabilities) -> bool {
        self.contains(required)
    }

    /// The capabilities `required` asks for that `self` does not provide.
    pub fn missing(&self, required: Capabilities) -> Capabilities {
        required.difference(*self)
    }

    /// Human-readable flag names, for error messages and logs.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.contains(Capabilities::WORKSPACE) {
            names.push("workspace");
        }
        if self.contains(Capabilities::PROCESS_SPAWN) {
            names.push("process_spawn");
        }
        if self.contains(Capabilities::NETWORK) {
            names.push("network");
        }
        if self.contains(Capabilities::MODEL_CALLER) {
            names.push("model_caller");
        }
        names
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.names().join("|"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn satisfies_is_a_superset_check() {
        let runtime = Capabilities::FULL_LOCAL;
        assert!(runtime.satisfies(Capabilities::WORKSPACE));
        assert!(runtime.satisfies(Capabilities::PROCESS_SPAWN));
        assert!(!runtime.satisfies(Capabilities::NETWORK));
    }

    #[test]
    fn missing_reports_only_the_gap() {
        let runtime = Capabilities::WORKSPACE;
        let required = Capabilities::WORKSPACE | Capabilities::NETWORK;
        assert_eq!(runtime.missing(required), Capabilities::NETWORK);
    }

    #[test]
    fn display_lists_flag_names() {
        let caps = Capabilities::WORKSPACE | Capabilities::NETWORK;
        assert_eq!(caps.to_string(), "workspace|network");
    }
}
