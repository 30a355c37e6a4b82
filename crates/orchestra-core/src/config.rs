//! Process-wide policy and configuration. Grounded on the teacher's
//! `config/mod.rs` (serde + TOML, optional file, `Default` so the
//! orchestrator runs with zero configuration present). File-location
//! discovery UX is out of scope (spec §1); only the typed struct and its
//! TOML (de)serialization are in scope here.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

/// Session-wide approval policy (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ApprovalMode {
    #[default]
    Default,
    AutoEditOnly,
    Yolo,
}

/// Process-lifetime set of (tool-name, optional server-name) pairs for which
/// future approvals are short-circuited. Copy-on-write on mutation so
/// readers never block a writer and vice versa (spec §5).
#[derive(Clone, Default)]
pub struct AlwaysAllowSet {
    inner: Arc<RwLock<HashSet<(String, Option<String>)>>>,
}

impl AlwaysAllowSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_tool(&self, tool_name: &str) {
        self.insert(tool_name.to_string(), None);
    }

    pub fn allow_server(&self, tool_name: &str, server_name: &str) {
        self.insert(tool_name.to_string(), Some(server_name.to_string()));
    }

    fn insert(&self, tool_name: String, server_name: Option<String>) {
        let mut guard = self.inner.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut next = (*guard).clone();
        next.insert((tool_name, server_name));
        *guard = next;
    }

    pub fn is_allowed(&self, tool_name: &str, server_name: Option<&str>) -> bool {
        let guard = self.inner.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.contains(&(tool_name.to_string(), None))
            || server_name.is_some_and(|s| {
                guard.contains(&(tool_name.to_string(), Some(s.to_string())))
            })
    }
}

/// Unit suffix on a `maxAge` retention value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgeUnit {
    Hours,
    Days,
    Weeks,
    Months,
}

/// `{value}{unit}` retention age, e.g. `"7d"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaxAge {
    pub value: u64,
    pub unit: AgeUnit,
}

impl MaxAge {
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        let unit_char = s.chars().last()?;
        let unit = match unit_char {
            'h' => AgeUnit::Hours,
            'd' => AgeUnit::Days,
            'w' => AgeUnit::Weeks,
            'm' => AgeUnit::Months,
            _ => return None,
        };
        let value: u64 = s[..s.len() - 1].parse().ok()?;
        if value == 0 {
            return None;
        }
        Some(Self { value, unit })
    }

    pub fn as_duration(&self) -> chrono::Duration {
        match self.unit {
            AgeUnit::Hours => chrono::Duration::hours(self.value as i64),
            AgeUnit::Days => chrono::Duration::days(self.value as i64),
            AgeUnit::Weeks => chrono::Duration::weeks(self.value as i64),
            // Calendar months are ambiguous; approximate as 30-day months,
            // consistent with a retention sweep rather than a calendar tool.
            AgeUnit::Months => chrono::Duration::days(self.value as i64 * 30),
        }
    }
}

/// Session-file retention policy (spec §6). Invalid configuration (any field
/// fails to parse) disables cleanup entirely rather than guessing — see
/// [`RetentionPolicy::from_raw`].
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    pub max_age: Option<MaxAge>,
    pub max_count: Option<usize>,
    pub min_retention: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_age: None,
            max_count: None,
            min_retention: 1,
        }
    }
}

impl RetentionPolicy {
    pub fn from_raw(raw: &RawRetentionPolicy) -> Option<Self> {
        let max_age = match &raw.max_age {
            Some(s) => Some(MaxAge::parse(s)?),
            None => None,
        };
        Some(Self {
            max_age,
            max_count: raw.max_count,
            min_retention: raw.min_retention.unwrap_or(1),
        })
    }
}

/// Raw, possibly-invalid TOML representation of [`RetentionPolicy`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRetentionPolicy {
    pub max_age: Option<String>,
    pub max_count: Option<usize>,
    pub min_retention: Option<usize>,
}

/// Exit codes (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    NormalQuit = 0,
    UnrecoverableError = 1,
    ConfigurationError = 2,
}

/// Concurrency limits (spec §5): unbounded for non-Exec tools, serialized for
/// Exec.
#[derive(Debug, Clone, Copy)]
pub struct ConcurrencyLimits {
    pub non_exec: usize,
    pub exec: usize,
}

impl Default for ConcurrencyLimits {
    fn default() -> Self {
        Self {
            non_exec: usize::MAX / 2,
            exec: 1,
        }
    }
}

/// Loop-detection thresholds (spec §4.5): larger windows for exploratory
/// states, smaller for editing.
#[derive(Debug, Clone, Copy)]
pub struct LoopDetectionThresholds {
    pub exploratory: usize,
    pub editing: usize,
}

impl Default for LoopDetectionThresholds {
    fn default() -> Self {
        Self {
            exploratory: 6,
            editing: 3,
        }
    }
}

/// Model/quota fallback pair (spec §4.3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelFallback {
    pub primary_model: Option<String>,
    pub fallback_model: Option<String>,
}

/// Process-wide orchestrator configuration, loaded from an optional TOML
/// file with `Default` filling in every field when absent.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub approval_mode: ApprovalMode,
    pub retention: RetentionPolicy,
    pub concurrency: ConcurrencyLimits,
    pub loop_detection: LoopDetectionThresholds,
    pub model_fallback: ModelFallback,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            approval_mode: ApprovalMode::default(),
            retention: RetentionPolicy::default(),
            concurrency: ConcurrencyLimits::default(),
            loop_detection: LoopDetectionThresholds::default(),
            model_fallback: ModelFallback::default(),
        }
    }
}

/// Raw TOML document shape for [`OrchestratorConfig`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawConfig {
    #[serde(default)]
    pub approval_mode: Option<String>,
    #[serde(default)]
    pub retention: RawRetentionPolicy,
    #[serde(default)]
    pub model_fallback: ModelFallback,
}

impl OrchestratorConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        let raw: RawConfig = toml::from_str(s)?;
        Ok(Self::from_raw(raw))
    }

    fn from_raw(raw: RawConfig) -> Self {
        let approval_mode = match raw.approval_mode.as_deref() {
            Some("auto_edit_only") => ApprovalMode::AutoEditOnly,
            Some("yolo") => ApprovalMode::Yolo,
            _ => ApprovalMode::Default,
        };
        let retention = RetentionPolicy::from_raw(&raw.retention).unwrap_or_else(|| {
            tracing::warn!(
                target: "config",
                "invalid retention policy in configuration; cleanup disabled"
            );
            RetentionPolicy {
                max_age: None,
                max_count: None,
                min_retention: usize::MAX,
            }
        });
        Self {
            approval_mode,
            retention,
            concurrency: ConcurrencyLimits::default(),
            loop_detection: LoopDetectionThresholds::default(),
            model_fallback: raw.model_fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_age_parses_unit_suffix() {
        let age = MaxAge::parse("7d").unwrap();
        assert_eq!(age.value, 7);
        assert_eq!(age.unit, AgeUnit::Days);
    }

    #[test]
    fn max_age_rejects_zero_and_bad_unit() {
        assert!(MaxAge::parse("0d").is_none());
        assert!(MaxAge::parse("7x").is_none());
        assert!(MaxAge::parse("").is_none());
    }

    #[test]
    fn invalid_retention_disables_cleanup() {
        let cfg = OrchestratorConfig::from_toml_str(
            r#"
            [retention]
            max_age = "not-a-duration"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.retention.min_retention, usize::MAX);
        assert!(cfg.retention.max_age.is_none());
    }

    #[test]
    fn always_allow_set_scopes_by_server() {
        let set = AlwaysAllowSet::new();
        assert!(!set.is_allowed("bash", None));
        set.allow_server("mcp_tool", "server_a");
        assert!(!set.is_allowed("mcp_tool", Some("server_b")));
        assert!(set.is_allowed("mcp_tool", Some("server_a")));
        set.allow_tool("bash");
        assert!(set.is_allowed("bash", None));
        assert!(set.is_allowed("bash", Some("anything")));
    }
}
