//! Conversation history (spec §4.3 step 4, §9: "mutable array of parts →
//! append-only log with committed revisions"). Content streamed from the
//! model accumulates in an in-progress buffer that is only ever folded into
//! the committed log as one atomic entry — a reader never observes a
//! partially-streamed turn as committed history. Grounded on the teacher's
//! `session/history.rs` (`Vec<Message>` with a `pending` scratch entry).

/// Length past which an in-progress buffer is flushed to committed history
/// on its own, rather than growing unboundedly across an entire streamed
/// turn (spec §4.3, "append-only log with committed revisions" — a
/// committed revision should itself stay a splittable, boundedly-sized
/// unit).
const SPLITTABLE_LENGTH_THRESHOLD: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Default)]
pub struct ConversationHistory {
    committed: Vec<HistoryEntry>,
    in_progress: Option<(Role, String)>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a complete entry directly (e.g. the user's own submission).
    pub fn append(&mut self, role: Role, content: impl Into<String>) {
        self.committed.push(HistoryEntry { role, content: content.into() });
    }

    /// Start (or continue) accumulating a streamed entry. Calling this
    /// again for the same role before committing just keeps appending to
    /// the same in-progress buffer.
    pub fn push_chunk(&mut self, role: Role, chunk: &str) {
        match &mut self.in_progress {
            Some((existing_role, buf)) if *existing_role == role => {
                buf.push_str(chunk);
                if buf.len() >= SPLITTABLE_LENGTH_THRESHOLD {
                    self.commit_in_progress();
                }
            }
            _ => {
                self.commit_in_progress();
                self.in_progress = Some((role, chunk.to_string()));
            }
        }
    }

    /// Fold the in-progress buffer into committed history as one entry.
    /// A no-op if nothing is buffered — callers call this unconditionally
    /// at turn boundaries.
    pub fn commit_in_progress(&mut self) {
        if let Some((role, content)) = self.in_progress.take() {
            if !content.is_empty() {
                self.committed.push(HistoryEntry { role, content });
            }
        }
    }

    /// Replace the committed log wholesale with a compacted summary (spec
    /// §4.3 `ChatCompressed`) — the one mutation allowed against an
    /// otherwise append-only log, since compaction is itself the recorded
    /// revision boundary.
    pub fn replace_with_summary(&mut self, summary: impl Into<String>) {
        self.commit_in_progress();
        self.committed = vec![HistoryEntry { role: Role::Assistant, content: summary.into() }];
    }

    pub fn committed(&self) -> &[HistoryEntry] {
        &self.committed
    }
}
