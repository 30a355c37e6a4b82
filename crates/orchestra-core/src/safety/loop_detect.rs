//! Sliding-window tool-call loop detection (spec §4.5): fingerprints recent
//! tool calls by `(tool_name, normalized_params)` and flags when the same
//! fingerprint recurs more than the state-dependent threshold within the
//! window. No direct teacher analogue exists (the teacher has no loop
//! detector); this is grounded on the surrounding actor/state-machine idiom
//! of `session_actor.rs` and the thresholds specified in §4.5.

use std::collections::{HashMap, VecDeque};

use crate::config::LoopDetectionThresholds;

/// Coarse orchestrator state used to pick a detection threshold: editing
/// work is flagged sooner than open-ended exploration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Exploratory,
    Editing,
}

impl std::fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exploratory => write!(f, "exploratory"),
            Self::Editing => write!(f, "editing"),
        }
    }
}

const WINDOW_SIZE: usize = 20;

/// Fixed-size ring of recent fingerprints plus counts, reset whenever the
/// user sends a new prompt (spec §4.5 — detection is scoped to a single
/// turn's tool-call stream, not the whole session).
pub struct LoopDetector {
    window: VecDeque<String>,
    counts: HashMap<String, usize>,
    thresholds: LoopDetectionThresholds,
    /// Set once the user answers "no" to "disable loop detection for this
    /// session?" (spec §4.5). Deliberately not cleared by `reset()` — the
    /// user's choice outlives any one turn's window.
    disabled: bool,
}

impl LoopDetector {
    pub fn new(thresholds: LoopDetectionThresholds) -> Self {
        Self {
            window: VecDeque::with_capacity(WINDOW_SIZE),
            counts: HashMap::new(),
            thresholds,
            disabled: false,
        }
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.counts.clear();
    }

    /// Turn off detection for the remainder of the session (spec §4.5's
    /// "ask user to disable" flow). Irreversible within a session — there is
    /// no corresponding `enable`.
    pub fn disable(&mut self) {
        self.disabled = true;
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    fn threshold_for(&self, state: OrchestratorState) -> usize {
        match state {
            OrchestratorState::Exploratory => self.thresholds.exploratory,
            OrchestratorState::Editing => self.thresholds.editing,
        }
    }

    /// Record a fingerprint (`tool_name` plus a normalized rendering of its
    /// parameters) and report whether the threshold for `state` has now been
    /// exceeded.
    pub fn record(&mut self, fingerprint: String, state: OrchestratorState) -> Option<usize> {
        if self.disabled {
            return None;
        }
        if self.window.len() == WINDOW_SIZE {
            if let Some(evicted) = self.window.pop_front() {
                if let Some(c) = self.counts.get_mut(&evicted) {
                    *c -= 1;
                    if *c == 0 {
                        self.counts.remove(&evicted);
                    }
                }
            }
        }
        self.window.push_back(fingerprint.clone());
        let count = self.counts.entry(fingerprint).or_insert(0);
        *count += 1;

        let threshold = self.threshold_for(state);
        if *count > threshold {
            tracing::debug!(
                target: "safety.loop_detect",
                count = *count,
                threshold,
                state = ?state,
                "fingerprint repetition exceeded threshold"
            );
            Some(*count)
        } else {
            None
        }
    }
}

/// Build a fingerprint from a tool name and its JSON parameters. Whitespace
/// differences in the JSON text do not affect the fingerprint since
/// `serde_json::Value` equality/hash is structural after parsing, but
/// `to_string` on the same parsed value is stable, which is all identity
/// comparison here requires.
pub fn fingerprint(tool_name: &str, params: &serde_json::Value) -> String {
    format!("{tool_name}:{params}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_after_exceeding_editing_threshold() {
        let mut detector = LoopDetector::new(LoopDetectionThresholds {
            exploratory: 6,
            editing: 3,
        });
        let fp = fingerprint("edit", &serde_json::json!({"path": "a.rs"}));
        assert!(detector.record(fp.clone(), OrchestratorState::Editing).is_none());
        assert!(detector.record(fp.clone(), OrchestratorState::Editing).is_none());
        assert!(detector.record(fp.clone(), OrchestratorState::Editing).is_none());
        assert_eq!(
            detector.record(fp, OrchestratorState::Editing),
            Some(4)
        );
    }

    #[test]
    fn exploratory_state_tolerates_more_repeats() {
        let mut detector = LoopDetector::new(LoopDetectionThresholds {
            exploratory: 6,
            editing: 3,
        });
        let fp = fingerprint("grep", &serde_json::json!({"pattern": "foo"}));
        for _ in 0..6 {
            assert!(detector
                .record(fp.clone(), OrchestratorState::Exploratory)
                .is_none());
        }
        assert!(detector
            .record(fp, OrchestratorState::Exploratory)
            .is_some());
    }

    #[test]
    fn reset_clears_history() {
        let mut detector = LoopDetector::new(LoopDetectionThresholds {
            exploratory: 6,
            editing: 1,
        });
        let fp = fingerprint("bash", &serde_json::json!({"command": "ls"}));
        assert!(detector.record(fp.clone(), OrchestratorState::Editing).is_some());
        detector.reset();
        assert!(detector.record(fp, OrchestratorState::Editing).is_none());
    }

    #[test]
    fn disabling_suppresses_future_detection_across_resets() {
        let mut detector = LoopDetector::new(LoopDetectionThresholds {
            exploratory: 6,
            editing: 1,
        });
        let fp = fingerprint("bash", &serde_json::json!({"command": "ls"}));
        detector.disable();
        assert!(detector.is_disabled());
        assert!(detector.record(fp.clone(), OrchestratorState::Editing).is_none());
        detector.reset();
        assert!(detector.record(fp, OrchestratorState::Editing).is_none());
        assert!(detector.is_disabled());
    }

    #[test]
    fn different_fingerprints_do_not_interfere() {
        let mut detector = LoopDetector::new(LoopDetectionThresholds {
            exploratory: 6,
            editing: 1,
        });
        let a = fingerprint("read", &serde_json::json!({"path": "a.rs"}));
        let b = fingerprint("read", &serde_json::json!({"path": "b.rs"}));
        assert!(detector.record(a, OrchestratorState::Editing).is_some());
        assert!(detector.record(b, OrchestratorState::Editing).is_none());
    }
}
