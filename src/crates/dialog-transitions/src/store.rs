//! The [`TransitionStore`] trait — the host-supplied persistence contract.
//!
//! `dialog-engine` never stores anything itself; every `Dialog::process`
//! call reads the last entry and appends at most one new one through this
//! trait. Implement it against whatever database the host already uses
//! (Postgres, SQLite, DynamoDB, ...) the same way a `CheckpointSaver`
//! implementation backs the teacher's graph engine with a real store.
//!
//! # Ordering contract
//!
//! Per spec §5, entries for a single dialog must form a total order by
//! `when`: no two entries for the same dialog may share a timestamp, and
//! [`TransitionStore::last`] must return the entry with the greatest `when`.
//! Implementations are expected to enforce this themselves (e.g. a unique
//! index on `(dialog, when)`); [`InMemoryTransitionStore`] rejects collisions
//! with [`crate::StoreError::DuplicateTimestamp`].

use crate::entry::TransitionLogEntry;
use crate::error::Result;
use async_trait::async_trait;

/// Durable storage for a dialog's transition log.
#[async_trait]
pub trait TransitionStore: Send + Sync {
    /// Append a new entry. Implementations must reject a `when` that
    /// collides with an existing entry for the same dialog.
    async fn append(&self, entry: TransitionLogEntry) -> Result<()>;

    /// The most recent entry for `dialog` (greatest `when`), or `None` if
    /// the dialog has never transitioned.
    async fn last(&self, dialog: &str) -> Result<Option<TransitionLogEntry>>;

    /// All entries for `dialog`, ordered by `when` ascending.
    async fn all(&self, dialog: &str) -> Result<Vec<TransitionLogEntry>>;

    /// Entries matching `new_state_id` (and `prior_state_id`, and
    /// optionally `reason`) — the query the `Loop`, `BranchingPrompt`, and
    /// `TimeElapsedInterrupt` nodes use to count prior visits without
    /// re-deriving state from scratch each tick.
    async fn prior_transitions(
        &self,
        dialog: &str,
        new_state_id: &str,
        prior_state_id: Option<&str>,
        reason: Option<&str>,
    ) -> Result<Vec<TransitionLogEntry>> {
        let matches = self
            .all(dialog)
            .await?
            .into_iter()
            .filter(|e| e.state_id == new_state_id)
            .filter(|e| prior_state_id.is_none() || e.prior_state_id.as_deref() == prior_state_id)
            .filter(|e| reason.is_none() || e.reason() == reason)
            .collect();

        Ok(matches)
    }
}
