//! Session persistence: an append-only event log per session id, plus
//! retention cleanup driven by [`crate::config::RetentionPolicy`]. Grounded
//! on the teacher's `app/domain/session::EventStore` trait (async,
//! sequence-numbered append) and `InMemoryEventStore`; the file-backed JSONL
//! implementation is grounded on `app/domain/session::sqlite_event_store.rs`
//! only for its *shape* (one store per session id, `list_session_ids` plus
//! per-session metadata for retention sweeps) — JSONL rather than SQLite
//! since this crate has no database dependency in its stack to begin with.

pub mod persistence;

pub use persistence::{FileSessionStore, SessionRecord, SessionStore, SessionStoreError};
