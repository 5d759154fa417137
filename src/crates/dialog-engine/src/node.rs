//! The node contract: `parse` (via [`NodeRegistry`]), `evaluate`,
//! `actions`, `next_nodes`, `definition`, `prefix` (spec §3, §9).
//!
//! The source dispatches node types through Python subclass discovery
//! (`__subclasses__`). Per the design note in spec §9 we reimplement this
//! as a plain registry keyed by the `type` string, each entry a parse
//! function returning a boxed trait object — no reflection.

use crate::clock::Clock;
use crate::error::{EngineError, Result};
use crate::rng::RngSource;
use crate::transition::{Action, Transition};
use crate::variables::VariableStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dialog_transitions::{TransitionLogEntry, TransitionStore};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Everything a node's `evaluate` needs to read. Nodes never mutate
/// anything here except through [`VariableStore`]'s interior mutability
/// (used only by the interrupt mechanism — see spec §9's "Global state"
/// note), and through the transition they return.
pub struct EvalContext<'a> {
    pub response: Option<&'a str>,
    pub last_transition: Option<&'a TransitionLogEntry>,
    pub extras: &'a Value,
    pub variables: &'a VariableStore,
    pub clock: &'a dyn Clock,
    pub rng: &'a dyn RngSource,
    pub dialog_started: DateTime<Utc>,
    pub dialog_key: &'a str,
    pub store: &'a (dyn TransitionStore + 'a),
}

impl<'a> EvalContext<'a> {
    /// Entries previously logged matching `(new_state_id, prior_state_id,
    /// reason)` — the query `Loop`, `BranchingPrompt`, and
    /// `TimeElapsedInterrupt` use to derive counters from history instead
    /// of keeping their own mutable counters (spec §5: "counters ... are
    /// derived from it and must be stable").
    pub async fn prior_transitions(
        &self,
        new_state_id: &str,
        prior_state_id: Option<&str>,
        reason: Option<&str>,
    ) -> Result<Vec<TransitionLogEntry>> {
        Ok(self.store.prior_transitions(self.dialog_key, new_state_id, prior_state_id, reason).await?)
    }

    pub fn seconds_since(&self, when: DateTime<Utc>) -> f64 {
        let elapsed = (self.clock.now() - when).num_milliseconds() as f64 / 1000.0;
        // spec §5: "tolerate clock skew by treating negative elapsed times as not elapsed"
        elapsed.max(0.0)
    }

    pub fn seconds_since_start(&self) -> f64 {
        self.seconds_since(self.dialog_started)
    }
}

/// Common contract every node kind implements (spec §3).
#[async_trait]
pub trait Node: Send + Sync {
    fn id(&self) -> &str;
    fn kind(&self) -> &'static str;
    fn node_name(&self) -> Option<&str> {
        None
    }

    /// The node's one-hop `evaluate`. Pure given its inputs, except
    /// `Interrupt`/`InterruptResume`, which push/pop the interrupt stack as
    /// a documented side effect (spec §4.3).
    async fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Option<Transition>>;

    /// The node's entry actions — a pure function of the node itself for
    /// every kind except `custom`, whose action script is not modeled as a
    /// static list (spec §3).
    fn actions(&self) -> Vec<Action>;

    /// Every node id this node can transition to, for the linter and the
    /// embedding expander's reference rewriting. Does not include ids that
    /// only appear inside actions.
    fn next_nodes(&self) -> Vec<String>;

    /// Round-trips this node back to its JSON definition, reflecting any
    /// mutation applied since parse (sentinel repair, prefixing).
    fn definition(&self) -> Value;

    /// Rewrites this node's own id and every destination field it owns
    /// (`next_id`, `false_id`, `loop_id`, ...) by prepending `prefix`. Used
    /// by the embedding expander; idempotent only when called once per
    /// instance (spec §4.4).
    fn prefix(&mut self, prefix: &str);

    /// Case-insensitive regex patterns this node pre-empts on, for the
    /// machine's pre-dispatch interrupt scan (spec §4.1). Only `Interrupt`
    /// overrides this.
    fn interrupt_patterns(&self) -> Option<&[String]> {
        None
    }

    /// Narrows to a [`crate::nodes::TimeElapsedInterrupt`] for the
    /// pre-dispatch scan's elapsed-time check, without reaching for
    /// `Any`-based reflection (spec §9: "Do not leak reflection"). Only
    /// `TimeElapsedInterrupt` overrides this.
    fn as_time_elapsed_interrupt(&self) -> Option<&crate::nodes::TimeElapsedInterrupt> {
        None
    }
}

/// What a [`NodeParser`] hands back besides a clean parse.
pub enum ParseIssue {
    /// Spec §4.1's `MissingNextNode(container, key)`: the machine should
    /// insert the sentinel end node, patch `field` to point at it, and
    /// retry this same parse call.
    MissingNextNode { field: String },
    Other(EngineError),
}

impl From<EngineError> for ParseIssue {
    fn from(e: EngineError) -> Self {
        ParseIssue::Other(e)
    }
}

pub type ParseFn = fn(&Value) -> std::result::Result<Box<dyn Node>, ParseIssue>;

/// Registry of `type` string -> parser, replacing the source's subclass
/// discovery (spec §9).
#[derive(Clone)]
pub struct NodeRegistry {
    parsers: HashMap<&'static str, ParseFn>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self { parsers: HashMap::new() }
    }

    pub fn register(&mut self, type_name: &'static str, parser: ParseFn) -> &mut Self {
        self.parsers.insert(type_name, parser);
        self
    }

    pub fn get(&self, type_name: &str) -> Option<ParseFn> {
        self.parsers.get(type_name).copied()
    }

    /// The registry with every built-in node kind (spec §4.3) registered.
    /// Hosts extend this with [`NodeRegistry::register`] for custom kinds
    /// (spec §6: "Extension registry ... additional node parsers").
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        crate::nodes::register_builtins(&mut registry);
        registry
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Helper for required string fields shared by every node parser.
pub fn require_str<'a>(def: &'a Value, field: &str, node_kind: &str) -> Result<&'a str> {
    def.get(field).and_then(Value::as_str).ok_or_else(|| EngineError::MissingField {
        node: def.get("id").and_then(Value::as_str).unwrap_or(node_kind).to_string(),
        field: field.to_string(),
    })
}

/// Helper for a next-node-style field: absent or null triggers
/// [`ParseIssue::MissingNextNode`] so the machine can repair it.
pub fn require_next_id(def: &Value, field: &str) -> std::result::Result<String, ParseIssue> {
    match def.get(field).and_then(Value::as_str) {
        Some(id) => Ok(id.to_string()),
        None => Err(ParseIssue::MissingNextNode { field: field.to_string() }),
    }
}

pub fn opt_str(def: &Value, field: &str) -> Option<String> {
    def.get(field).and_then(Value::as_str).map(str::to_string)
}

pub fn opt_f64(def: &Value, field: &str) -> Option<f64> {
    def.get(field).and_then(Value::as_f64)
}

/// Rewrites an `Option<String>` node-id reference in place for `prefix()`
/// implementations.
pub fn prefix_opt(value: &mut Option<String>, prefix: &str) {
    if let Some(id) = value {
        *id = format!("{prefix}{id}");
    }
}

pub type SharedStore = Arc<dyn TransitionStore>;
