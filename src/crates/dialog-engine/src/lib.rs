//! A declarative dialog state-machine engine: a JSON-authored graph of
//! typed nodes, interpreted one tick at a time, producing host-facing
//! [`Action`]s and consuming the host's responses.
//!
//! The moving pieces, from the bottom up:
//!
//! - [`node`] — the [`Node`] trait every node kind implements, and the
//!   [`NodeRegistry`] that parses a script's raw JSON into trait objects.
//! - [`nodes`] — the built-in node kinds (spec §4.3): control flow
//!   (`begin`/`end`/`echo`/`alert`/`pause`), user interaction
//!   (`prompt`/`branch-prompt`/`external-choice`), branching
//!   (`if`/`branch-conditions`/`random-branch`/`custom`), looping (`loop`),
//!   pre-emption (`interrupt`/`interrupt-resume`/`time-elapsed-interrupt`),
//!   variable mutation (`record-variable`/`update-variable`), the network
//!   node (`http-response-branch`), and sub-graph embedding
//!   (`embed-dialog`).
//! - [`machine`] — [`DialogMachine`], the stateless-per-tick interpreter
//!   core: parses a script, repairs dangling next-node edges, scans for
//!   interrupts, and dispatches to the current node.
//! - [`dialog`] — [`Dialog`], the per-session orchestrator that wraps a
//!   machine with a transition log and implements the full `process`
//!   algorithm (spec §4.2).
//! - [`linter`] and [`embed`] — pre-flight script validation and sub-graph
//!   inlining, both run before a script is handed to a `Dialog`.
//!
//! # Example
//!
//! ```no_run
//! use dialog_engine::{Dialog, EngineConfig, NodeRegistry};
//! use dialog_engine::clock::SystemClock;
//! use dialog_engine::rng::SeededRng;
//! use dialog_transitions::InMemoryTransitionStore;
//! use std::sync::Arc;
//! use serde_json::json;
//!
//! # async fn run() -> dialog_engine::error::Result<()> {
//! let script = vec![
//!     json!({"type": "begin", "id": "b", "next_id": "e"}),
//!     json!({"type": "echo", "id": "e", "message": "hello", "next_id": "end"}),
//!     json!({"type": "end", "id": "end"}),
//! ];
//! let store = Arc::new(InMemoryTransitionStore::new());
//! let mut dialog = Dialog::new(
//!     "session-1",
//!     script,
//!     store,
//!     NodeRegistry::builtin(),
//!     EngineConfig::default(),
//!     Box::new(SystemClock),
//!     Box::new(SeededRng::from_entropy()),
//! );
//! let result = dialog.process(None, json!({})).await?;
//! println!("{:?}", result.actions);
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod dialog;
pub mod embed;
pub mod error;
pub mod expr;
pub mod linter;
pub mod machine;
pub mod node;
pub mod nodes;
pub mod rng;
pub mod template;
pub mod transition;
pub mod variables;

#[cfg(test)]
mod test_support;

pub use config::{EngineConfig, EngineConfigBuilder};
pub use dialog::{Dialog, FinishReason, ProcessResult};
pub use embed::ScriptRegistry;
pub use error::{EngineError, Result};
pub use linter::{LintIssue, Linter};
pub use machine::DialogMachine;
pub use node::{EvalContext, Node, NodeRegistry};
pub use transition::{Action, ChoiceOption, Reason, Transition};
pub use variables::VariableStore;
