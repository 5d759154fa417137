//! Sub-graph embedding (spec §4.4): resolves `embed-dialog` nodes against
//! a host-supplied sub-script registry, inlining the target's nodes with a
//! unique id prefix via [`crate::node::Node::prefix`], and splicing the
//! sub-script's `begin`/`end` into zero-duration `Pause` nodes — the shape
//! `pause.rs`'s self-referential default `next_id` exists to support.

use crate::error::{EngineError, Result};
use crate::node::{NodeRegistry, ParseIssue};
use serde_json::{json, Value};
use std::collections::HashSet;

/// Host-supplied lookup from `script_id` to that sub-script's node array.
pub trait ScriptRegistry: Send + Sync {
    fn get(&self, script_id: &str) -> Option<Vec<Value>>;
}

/// Expands every `embed-dialog` node in `definition`, recursively. A
/// sub-script that cannot be resolved (unknown id, or a cycle) is left in
/// place with `resolution_error` set rather than failing the whole
/// expansion — the per-node fallback `EmbedDialog::evaluate` exists for
/// (spec §4.4).
pub fn expand(definition: Vec<Value>, scripts: &dyn ScriptRegistry, registry: &NodeRegistry) -> Result<Vec<Value>> {
    expand_inner(definition, scripts, registry, &mut HashSet::new(), &mut 0)
}

fn expand_inner(
    definition: Vec<Value>,
    scripts: &dyn ScriptRegistry,
    registry: &NodeRegistry,
    ancestors: &mut HashSet<String>,
    counter: &mut usize,
) -> Result<Vec<Value>> {
    let mut output = Vec::with_capacity(definition.len());

    for node_def in definition {
        if node_def.get("type").and_then(Value::as_str) != Some("embed-dialog") {
            output.push(node_def);
            continue;
        }

        let embed_id = node_def.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
        let script_id = node_def.get("script_id").and_then(Value::as_str).unwrap_or_default().to_string();
        let next_id = node_def.get("next_id").and_then(Value::as_str).unwrap_or_default().to_string();

        if ancestors.contains(&script_id) {
            output.push(unresolved_embed(&embed_id, &next_id, &script_id, "cyclic embed"));
            continue;
        }

        let Some(sub_script) = scripts.get(&script_id) else {
            output.push(unresolved_embed(&embed_id, &next_id, &script_id, "unknown script_id"));
            continue;
        };

        ancestors.insert(script_id.clone());
        let expanded_sub = expand_inner(sub_script, scripts, registry, ancestors, counter)?;
        ancestors.remove(&script_id);

        *counter += 1;
        let prefix = format!("__embed{}__", counter);

        let mut begin_next_id = None;
        let mut spliced = Vec::with_capacity(expanded_sub.len());

        for raw in &expanded_sub {
            let type_name = raw.get("type").and_then(Value::as_str).unwrap_or_default();
            let parser = registry
                .get(type_name)
                .ok_or_else(|| EngineError::EmbedFailure(script_id.clone(), format!("unknown node type '{type_name}' in embedded script")))?;
            let mut node = parser(raw).map_err(|issue| match issue {
                ParseIssue::Other(e) => e,
                ParseIssue::MissingNextNode { field } => {
                    EngineError::EmbedFailure(script_id.clone(), format!("embedded node missing next-node field '{field}'"))
                }
            })?;
            node.prefix(&prefix);

            if node.kind() == "begin" {
                begin_next_id = node.next_nodes().into_iter().next();
                continue;
            }
            if node.kind() == "end" {
                spliced.push(json!({"type": "pause", "id": node.id(), "duration": 0.0, "next_id": next_id}));
                continue;
            }
            spliced.push(node.definition());
        }

        let Some(entry_id) = begin_next_id else {
            return Err(EngineError::EmbedFailure(script_id.clone(), "embedded script has no begin node".to_string()));
        };

        output.push(json!({"type": "pause", "id": embed_id, "duration": 0.0, "next_id": entry_id}));
        output.extend(spliced);
    }

    Ok(output)
}

fn unresolved_embed(embed_id: &str, next_id: &str, script_id: &str, reason: &str) -> Value {
    json!({
        "type": "embed-dialog",
        "id": embed_id,
        "script_id": script_id,
        "next_id": next_id,
        "resolution_error": reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::machine::DialogMachine;
    use std::collections::HashMap;

    struct MapRegistry(HashMap<String, Vec<Value>>);

    impl ScriptRegistry for MapRegistry {
        fn get(&self, script_id: &str) -> Option<Vec<Value>> {
            self.0.get(script_id).cloned()
        }
    }

    #[test]
    fn inlines_sub_script_between_caller_nodes() {
        let outer = vec![
            json!({"type": "begin", "id": "b", "next_id": "embed1"}),
            json!({"type": "embed-dialog", "id": "embed1", "script_id": "greeting", "next_id": "done"}),
            json!({"type": "end", "id": "done"}),
        ];
        let sub = vec![
            json!({"type": "begin", "id": "sub_b", "next_id": "echo1"}),
            json!({"type": "echo", "id": "echo1", "message": "hi", "next_id": "sub_e"}),
            json!({"type": "end", "id": "sub_e"}),
        ];
        let mut scripts = HashMap::new();
        scripts.insert("greeting".to_string(), sub);
        let registry = NodeRegistry::builtin();

        let expanded = expand(outer, &MapRegistry(scripts), &registry).expect("expands cleanly");
        let machine = DialogMachine::build(&expanded, &registry, &EngineConfig::default()).expect("builds");
        assert!(machine.node("embed1").is_some(), "embed node becomes a pause in place");
        assert!(machine.node("__embed1__echo1").is_some(), "sub-script node is inlined with a unique prefix");
    }

    #[test]
    fn unknown_script_id_is_left_with_resolution_error() {
        let outer = vec![
            json!({"type": "begin", "id": "b", "next_id": "embed1"}),
            json!({"type": "embed-dialog", "id": "embed1", "script_id": "missing", "next_id": "done"}),
            json!({"type": "end", "id": "done"}),
        ];
        let scripts = MapRegistry(HashMap::new());
        let registry = NodeRegistry::builtin();

        let expanded = expand(outer, &scripts, &registry).expect("does not fail the whole expansion");
        let embed_def = expanded.iter().find(|n| n.get("id").and_then(Value::as_str) == Some("embed1")).unwrap();
        assert_eq!(embed_def.get("resolution_error").and_then(Value::as_str), Some("unknown script_id"));
    }
}
