use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use uuid::Uuid;

use crate::config::RetentionPolicy;
use crate::ids::SessionId;

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("session not found: {0}")]
    NotFound(SessionId),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(String),
}

/// One appended line: a sequence number (gap-free per session, assigned by
/// the store) plus an opaque JSON payload. The store does not know or care
/// what event taxonomy the caller serializes into `payload` — that lets
/// [`crate::event_bus::Event`] or any future wire shape be persisted without
/// this module needing to change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionRecord {
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, session_id: SessionId) -> Result<(), SessionStoreError>;
    async fn append(&self, session_id: SessionId, payload: serde_json::Value) -> Result<u64, SessionStoreError>;
    async fn load(&self, session_id: SessionId) -> Result<Vec<SessionRecord>, SessionStoreError>;
    async fn session_exists(&self, session_id: SessionId) -> Result<bool, SessionStoreError>;
    async fn delete_session(&self, session_id: SessionId) -> Result<(), SessionStoreError>;
    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, SessionStoreError>;
}

/// JSONL-backed store: one file per session, one record per line, appended
/// under an exclusive per-file lock (reusing [`crate::scheduler::path_lock`]
/// so a session file is never torn by concurrent writers).
pub struct FileSessionStore {
    root: PathBuf,
}

impl FileSessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, session_id: SessionId) -> PathBuf {
        self.root.join(format!("{}.jsonl", file_stem_for(session_id)))
    }
}

/// Build a session file's stem: an ISO-8601 (basic format, colon-free so it
/// stays a valid filename on every platform) creation timestamp followed by
/// the session's full id. The timestamp is derived from the id's own
/// embedded UUIDv7 clock rather than a separately tracked creation time, so
/// `path_for` stays a pure function of `session_id` alone; a directory
/// listing still sorts chronologically by filename. The trailing 8 hex
/// characters of the id are what an operator reads at a glance as the
/// session's short suffix.
fn file_stem_for(session_id: SessionId) -> String {
    let timestamp = session_id
        .0
        .get_timestamp()
        .and_then(|ts| {
            let (secs, nanos) = ts.to_unix();
            DateTime::<Utc>::from_timestamp(secs as i64, nanos)
        })
        .unwrap_or_else(Utc::now);
    format!("{}-{}", timestamp.format("%Y%m%dT%H%M%SZ"), session_id.0.as_simple())
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn create_session(&self, session_id: SessionId) -> Result<(), SessionStoreError> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| SessionStoreError::Io(e.to_string()))?;
        let path = self.path_for(session_id);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tokio::fs::File::create(&path).await.map_err(|e| SessionStoreError::Io(e.to_string()))?;
        }
        Ok(())
    }

    async fn append(&self, session_id: SessionId, payload: serde_json::Value) -> Result<u64, SessionStoreError> {
        let path = self.path_for(session_id);
        let _guard = crate::scheduler::path_lock::lock_path(&path).await;

        let existing = read_records(&path).await?;
        let seq = existing.last().map(|r| r.seq + 1).unwrap_or(0);
        let record = SessionRecord { seq, timestamp: Utc::now(), payload };
        let line = serde_json::to_string(&record).map_err(|e| SessionStoreError::Serialization(e.to_string()))?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| SessionStoreError::Io(e.to_string()))?;
        file.write_all(line.as_bytes()).await.map_err(|e| SessionStoreError::Io(e.to_string()))?;
        file.write_all(b"\n").await.map_err(|e| SessionStoreError::Io(e.to_string()))?;
        Ok(seq)
    }

    async fn load(&self, session_id: SessionId) -> Result<Vec<SessionRecord>, SessionStoreError> {
        let path = self.path_for(session_id);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(SessionStoreError::NotFound(session_id));
        }
        read_records(&path).await
    }

    async fn session_exists(&self, session_id: SessionId) -> Result<bool, SessionStoreError> {
        Ok(tokio::fs::try_exists(self.path_for(session_id)).await.unwrap_or(false))
    }

    async fn delete_session(&self, session_id: SessionId) -> Result<(), SessionStoreError> {
        let path = self.path_for(session_id);
        tokio::fs::remove_file(&path).await.map_err(|e| SessionStoreError::Io(e.to_string()))
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, SessionStoreError> {
        let mut summaries = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(_) => return Ok(summaries),
        };
        while let Some(entry) = entries.next_entry().await.map_err(|e| SessionStoreError::Io(e.to_string()))? {
            let path = entry.path();
            let Some(session_id) = session_id_from_path(&path) else { continue };
            let metadata = entry.metadata().await.map_err(|e| SessionStoreError::Io(e.to_string()))?;
            let updated_at = metadata
                .modified()
                .ok()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(Utc::now);
            summaries.push(SessionSummary { session_id, updated_at });
        }
        Ok(summaries)
    }
}

async fn read_records(path: &Path) -> Result<Vec<SessionRecord>, SessionStoreError> {
    let file = match tokio::fs::File::open(path).await {
        Ok(f) => f,
        Err(_) => return Ok(Vec::new()),
    };
    let mut lines = BufReader::new(file).lines();
    let mut records = Vec::new();
    while let Some(line) = lines.next_line().await.map_err(|e| SessionStoreError::Io(e.to_string()))? {
        if line.trim().is_empty() {
            continue;
        }
        let record: SessionRecord =
            serde_json::from_str(&line).map_err(|e| SessionStoreError::Serialization(e.to_string()))?;
        records.push(record);
    }
    Ok(records)
}

fn session_id_from_path(path: &Path) -> Option<SessionId> {
    let stem = path.file_stem()?.to_str()?;
    let uuid_part = stem.rsplit('-').next()?;
    Uuid::parse_str(uuid_part).ok().map(SessionId)
}

/// Apply a retention policy against every known session, skipping any id in
/// `active_sessions` unconditionally (spec §6: a session currently in use is
/// never deleted regardless of age or count). Returns the ids actually
/// removed.
pub async fn cleanup_expired(
    store: &dyn SessionStore,
    policy: &RetentionPolicy,
    active_sessions: &HashSet<SessionId>,
) -> Result<Vec<SessionId>, SessionStoreError> {
    let mut summaries = store.list_sessions().await?;
    summaries.sort_by_key(|s| std::cmp::Reverse(s.updated_at));

    let now = Utc::now();
    let mut removed = Vec::new();

    for (rank, summary) in summaries.iter().enumerate() {
        if active_sessions.contains(&summary.session_id) {
            continue;
        }
        if rank < policy.min_retention {
            continue;
        }
        let age_exceeded = policy
            .max_age
            .is_some_and(|max_age| now.signed_duration_since(summary.updated_at) > max_age.as_duration());
        let count_exceeded = policy.max_count.is_some_and(|max_count| rank >= max_count);

        if age_exceeded || count_exceeded {
            store.delete_session(summary.session_id).await?;
            removed.push(summary.session_id);
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn append_then_load_round_trips_in_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path());
        let session_id = SessionId::new();
        store.create_session(session_id).await.unwrap();
        store.append(session_id, serde_json::json!({"kind": "a"})).await.unwrap();
        store.append(session_id, serde_json::json!({"kind": "b"})).await.unwrap();

        let records = store.load(session_id).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].seq, 0);
        assert_eq!(records[1].seq, 1);
    }

    #[tokio::test]
    async fn session_filename_embeds_a_timestamp_and_round_trips() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path());
        let session_id = SessionId::new();
        store.create_session(session_id).await.unwrap();

        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        let entry = entries.next_entry().await.unwrap().unwrap();
        let stem = entry.path().file_stem().unwrap().to_str().unwrap().to_string();
        let (timestamp_part, uuid_part) = stem.split_once('-').unwrap();
        assert_eq!(timestamp_part.len(), "20060102T150405Z".len());
        assert_eq!(uuid_part.len(), 32);

        assert_eq!(session_id_from_path(&entry.path()), Some(session_id));
    }

    #[tokio::test]
    async fn loading_an_unknown_session_is_not_found() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path());
        let err = store.load(SessionId::new()).await.unwrap_err();
        assert!(matches!(err, SessionStoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn cleanup_never_deletes_an_active_session_regardless_of_age() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path());
        let active = SessionId::new();
        store.create_session(active).await.unwrap();

        let mut active_set = HashSet::new();
        active_set.insert(active);

        let policy = RetentionPolicy { max_age: None, max_count: Some(0), min_retention: 0 };
        let removed = cleanup_expired(&store, &policy, &active_set).await.unwrap();
        assert!(removed.is_empty());
        assert!(store.session_exists(active).await.unwrap());
    }

    #[tokio::test]
    async fn cleanup_respects_max_count_beyond_min_retention() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path());
        for _ in 0..3 {
            let id = SessionId::new();
            store.create_session(id).await.unwrap();
        }
        let policy = RetentionPolicy { max_age: None, max_count: Some(1), min_retention: 0 };
        let removed = cleanup_expired(&store, &policy, &HashSet::new()).await.unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(store.list_sessions().await.unwrap().len(), 1);
    }
}
