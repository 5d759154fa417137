//! Error types for the dialog engine.
//!
//! All fallible engine operations return [`Result<T>`], an alias over
//! [`EngineError`]. Parse-time failures (malformed scripts) and run-time
//! failures (a node's `evaluate` going wrong) share this type rather than
//! getting separate hierarchies, since both ultimately surface to the same
//! caller: whatever drives `Dialog::process`.

use thiserror::Error;

/// Convenience alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Everything that can go wrong building or running a dialog.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A node definition named a `type` the registry has no parser for.
    #[error("unknown node type '{0}'")]
    UnknownNodeType(String),

    /// A node definition was missing a required field other than a
    /// next-node reference (those go through [`EngineError::MissingNextNode`]
    /// so the machine can attempt sentinel repair per spec §4.1).
    #[error("node '{node}' missing required field '{field}'")]
    MissingField { node: String, field: String },

    /// A node referenced a next-node id that the script never defines, and
    /// repair was either not attempted or not applicable to this field.
    #[error("node '{node}' field '{field}' missing a next-node id")]
    MissingNextNode { node: String, field: String },

    /// Two or more nodes in a script share an id.
    #[error("duplicate node id '{0}'")]
    DuplicateNodeId(String),

    /// A node's `next_id` (or equivalent) points at an id absent from the
    /// script.
    #[error("node '{node}' references unknown node id '{target}'")]
    DanglingReference { node: String, target: String },

    /// The script has no `begin` node, or more than one.
    #[error("script must have exactly one begin node, found {0}")]
    BadEntryCount(usize),

    /// Raised by [`crate::machine::DialogMachine::evaluate`] when asked to
    /// dispatch a node id the machine doesn't know about.
    #[error("no such node '{0}' in this dialog")]
    NoSuchNode(String),

    /// A linter check failed against a compiled script.
    #[error("lint failed: {0}")]
    LintFailure(String),

    /// Embedding a sub-script failed (missing script, id collision after
    /// prefixing, or a nested embed cycle).
    #[error("failed to embed dialog '{0}': {1}")]
    EmbedFailure(String, String),

    /// A `custom` node's expression failed to parse or evaluate.
    #[error("custom expression error: {0}")]
    Expression(String),

    /// The `http-response-branch` node's request failed.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A template payload referenced a variable that template rendering
    /// could not resolve, and the node requires the payload to fully
    /// render before use.
    #[error("template rendering failed: {0}")]
    Template(String),

    /// JSON (de)serialization failure — malformed script, or a node result
    /// that couldn't be turned back into its `definition()`.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The persistence layer reported a failure while the engine tried to
    /// read or append transition log entries.
    #[error("transition store error: {0}")]
    Store(#[from] dialog_transitions::StoreError),

    /// Application-defined error escape hatch, mirroring the teacher's
    /// `GraphError::Custom`.
    #[error("{0}")]
    Custom(String),
}
