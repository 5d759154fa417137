#![cfg(test)]
//! Shared scaffolding for node unit tests: a fixed clock, deterministic
//! rng, and an in-memory transition store, so individual node test modules
//! don't re-derive the same four lines of fixture setup.

use crate::clock::FixedClock;
use crate::node::EvalContext;
use crate::rng::FixedRng;
use crate::variables::VariableStore;
use chrono::{DateTime, Utc};
use dialog_transitions::{InMemoryTransitionStore, TransitionLogEntry};
use serde_json::Value;

pub struct TestHarness {
    pub clock: FixedClock,
    pub rng: FixedRng,
    pub store: InMemoryTransitionStore,
    pub variables: VariableStore,
    pub extras: Value,
    pub started: DateTime<Utc>,
}

impl TestHarness {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            clock: FixedClock(now),
            rng: FixedRng(0.5),
            store: InMemoryTransitionStore::new(),
            variables: VariableStore::new(),
            extras: Value::Object(Default::default()),
            started: now,
        }
    }

    pub fn ctx<'a>(&'a self, response: Option<&'a str>, last: Option<&'a TransitionLogEntry>) -> EvalContext<'a> {
        EvalContext {
            response,
            last_transition: last,
            extras: &self.extras,
            variables: &self.variables,
            clock: &self.clock,
            rng: &self.rng,
            dialog_started: self.started,
            dialog_key: "test-dialog",
            store: &self.store,
        }
    }
}

pub fn entry(state_id: &str, prior_state_id: Option<&str>, when: DateTime<Utc>) -> TransitionLogEntry {
    TransitionLogEntry {
        dialog: "test-dialog".to_string(),
        when,
        state_id: state_id.to_string(),
        prior_state_id: prior_state_id.map(str::to_string),
        metadata: Value::Object(Default::default()),
    }
}
