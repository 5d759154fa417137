//! In-memory [`TransitionStore`] for development, tests, and demos.
//!
//! Ported in spirit from the teacher's `InMemoryCheckpointSaver`: a
//! `HashMap<dialog, Vec<entry>>` behind a single async `RwLock`. Entries are
//! kept sorted by `when` on insertion so `last` and `all` are O(log n) /
//! O(n) respectively without a secondary index. Not for production use —
//! state is lost on process exit and the lock is a single global mutex, so
//! throughput across many concurrent dialogs will not scale past a
//! single-process deployment.

use crate::entry::TransitionLogEntry;
use crate::error::{Result, StoreError};
use crate::store::TransitionStore;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Thread-safe, process-local [`TransitionStore`] backed by a `HashMap`.
#[derive(Default)]
pub struct InMemoryTransitionStore {
    dialogs: RwLock<HashMap<String, Vec<TransitionLogEntry>>>,
}

impl InMemoryTransitionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove all recorded entries. Handy for isolating tests.
    pub async fn clear(&self) {
        self.dialogs.write().await.clear();
    }
}

#[async_trait]
impl TransitionStore for InMemoryTransitionStore {
    async fn append(&self, entry: TransitionLogEntry) -> Result<()> {
        let mut dialogs = self.dialogs.write().await;
        let log = dialogs.entry(entry.dialog.clone()).or_default();

        if log.iter().any(|e| e.when == entry.when) {
            return Err(StoreError::DuplicateTimestamp(entry.dialog));
        }

        let pos = log.partition_point(|e| e.when <= entry.when);
        log.insert(pos, entry);

        Ok(())
    }

    async fn last(&self, dialog: &str) -> Result<Option<TransitionLogEntry>> {
        let dialogs = self.dialogs.read().await;
        Ok(dialogs.get(dialog).and_then(|log| log.last()).cloned())
    }

    async fn all(&self, dialog: &str) -> Result<Vec<TransitionLogEntry>> {
        let dialogs = self.dialogs.read().await;
        Ok(dialogs.get(dialog).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn entry(dialog: &str, state: &str, prior: Option<&str>, when: chrono::DateTime<Utc>) -> TransitionLogEntry {
        TransitionLogEntry {
            dialog: dialog.to_string(),
            when,
            state_id: state.to_string(),
            prior_state_id: prior.map(str::to_string),
            metadata: json!({"reason": "echo-continue"}),
        }
    }

    #[tokio::test]
    async fn append_and_last() {
        let store = InMemoryTransitionStore::new();
        let t0 = Utc::now();

        store.append(entry("d1", "a", None, t0)).await.unwrap();
        store.append(entry("d1", "b", Some("a"), t0 + Duration::seconds(1))).await.unwrap();

        let last = store.last("d1").await.unwrap().unwrap();
        assert_eq!(last.state_id, "b");
        assert_eq!(last.prior_state_id.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn duplicate_timestamp_rejected() {
        let store = InMemoryTransitionStore::new();
        let t0 = Utc::now();

        store.append(entry("d1", "a", None, t0)).await.unwrap();
        let err = store.append(entry("d1", "b", Some("a"), t0)).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateTimestamp(_)));
    }

    #[tokio::test]
    async fn prior_transitions_filters_by_reason() {
        let store = InMemoryTransitionStore::new();
        let t0 = Utc::now();

        let mut e = entry("d1", "timeout_node", Some("prompt"), t0);
        e.metadata = json!({"reason": "timeout"});
        store.append(e).await.unwrap();

        let hits = store
            .prior_transitions("d1", "timeout_node", Some("prompt"), Some("timeout"))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);

        let misses = store
            .prior_transitions("d1", "timeout_node", Some("prompt"), Some("valid-response"))
            .await
            .unwrap();
        assert!(misses.is_empty());
    }

    #[tokio::test]
    async fn unknown_dialog_is_empty_not_error() {
        let store = InMemoryTransitionStore::new();
        assert!(store.last("nope").await.unwrap().is_none());
        assert!(store.all("nope").await.unwrap().is_empty());
    }
}
