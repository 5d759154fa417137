//! The append-only transition log entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single recorded movement of a dialog from one node to another.
///
/// Corresponds to spec.md §3's `TransitionLogEntry`: `dialog`, `when`
/// (indexed), `state_id` (indexed), `prior_state_id` (nullable, indexed),
/// and an open `metadata` map carrying the transition reason and any
/// node-specific detail (matched pattern, loop iteration, timeout duration,
/// ...). The log is append-only and ordered by `when`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransitionLogEntry {
    /// The dialog (session) key this entry belongs to.
    pub dialog: String,

    /// Wall-clock time the transition was recorded.
    pub when: DateTime<Utc>,

    /// The node id this transition moved *into*.
    pub state_id: String,

    /// The node id this transition moved *from*, or `None` for the first
    /// entry in a dialog's log.
    pub prior_state_id: Option<String>,

    /// Transition metadata: `reason`, and any node-specific fields.
    pub metadata: Value,
}

impl TransitionLogEntry {
    /// The `metadata.reason` field, if present and a string.
    pub fn reason(&self) -> Option<&str> {
        self.metadata.get("reason").and_then(Value::as_str)
    }
}
