//! Per-dialog variable store: `metadata.values` from spec §3, with scalar,
//! list, and stack semantics layered on top of a plain JSON map.
//!
//! Reads happen directly against this store from node `evaluate` bodies
//! (e.g. `If` reading a prior `store-value`). Writes triggered by
//! user-facing actions (`store-value`, `update-value`) are the host's job
//! per the action protocol — the store only mutates itself internally for
//! the interrupt stack, which the `Interrupt`/`InterruptResume` nodes push
//! and pop mid-evaluation.

use serde_json::{Map, Value};
use std::sync::RwLock;

/// The stack key the interrupt mechanism pushes/pops. Kept process-wide
/// constant per spec's design note ("hard-coded... namespace it per-dialog")
/// — namespacing comes from each [`VariableStore`] instance being
/// per-dialog, not from varying this key.
pub const INTERRUPT_STACK_KEY: &str = "django_dialog_engine_interrupt_node_stack";

/// Key/value state scoped to one dialog. Interior mutability lets node
/// `evaluate(&self, ctx: &EvalContext)` calls mutate it through a shared
/// reference, since the node contract is otherwise read-only.
#[derive(Debug, Default)]
pub struct VariableStore {
    values: RwLock<Map<String, Value>>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(values: Map<String, Value>) -> Self {
        Self { values: RwLock::new(values) }
    }

    /// Snapshot the whole store as a JSON object, e.g. to merge into
    /// template-rendering context or to persist in `Dialog::metadata`.
    pub fn snapshot(&self) -> Map<String, Value> {
        self.values.read().expect("variable store poisoned").clone()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.read().expect("variable store poisoned").get(key).cloned()
    }

    /// Storing `None` deletes the key.
    pub fn put(&self, key: &str, value: Option<Value>) {
        let mut values = self.values.write().expect("variable store poisoned");
        match value {
            Some(v) => {
                values.insert(key.to_string(), v);
            }
            None => {
                values.remove(key);
            }
        }
    }

    /// Appends to a list slot, lifting a scalar into a singleton list first.
    pub fn push(&self, key: &str, value: Value) {
        let mut values = self.values.write().expect("variable store poisoned");
        let slot = values.remove(key);
        let mut list = match slot {
            Some(Value::Array(items)) => items,
            Some(scalar) => vec![scalar],
            None => Vec::new(),
        };
        list.push(value);
        values.insert(key.to_string(), Value::Array(list));
    }

    /// Pops the last element. A scalar slot is deleted and returned whole;
    /// a list slot pops its tail and, once empty, is removed entirely.
    pub fn pop(&self, key: &str) -> Option<Value> {
        let mut values = self.values.write().expect("variable store poisoned");
        match values.remove(key) {
            Some(Value::Array(mut items)) => {
                let popped = items.pop();
                if !items.is_empty() {
                    values.insert(key.to_string(), Value::Array(items));
                }
                popped
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn put_none_deletes() {
        let store = VariableStore::new();
        store.put("k", Some(json!(1)));
        assert_eq!(store.get("k"), Some(json!(1)));
        store.put("k", None);
        assert_eq!(store.get("k"), None);
    }

    #[test]
    fn push_lifts_scalar_to_list() {
        let store = VariableStore::new();
        store.put("k", Some(json!("a")));
        store.push("k", json!("b"));
        assert_eq!(store.get("k"), Some(json!(["a", "b"])));
    }

    #[test]
    fn pop_scalar_deletes_and_returns() {
        let store = VariableStore::new();
        store.put("k", Some(json!(42)));
        assert_eq!(store.pop("k"), Some(json!(42)));
        assert_eq!(store.get("k"), None);
    }

    #[test]
    fn pop_list_removes_key_once_empty() {
        let store = VariableStore::new();
        store.push("k", json!(1));
        assert_eq!(store.pop("k"), Some(json!(1)));
        assert_eq!(store.get("k"), None);
    }

    #[test]
    fn interrupt_stack_push_pop_order() {
        let store = VariableStore::new();
        store.push(INTERRUPT_STACK_KEY, json!("a"));
        store.push(INTERRUPT_STACK_KEY, json!("b"));
        assert_eq!(store.pop(INTERRUPT_STACK_KEY), Some(json!("b")));
        assert_eq!(store.pop(INTERRUPT_STACK_KEY), Some(json!("a")));
        assert_eq!(store.get(INTERRUPT_STACK_KEY), None);
    }
}
