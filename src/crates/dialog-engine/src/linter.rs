//! Static checks run over a compiled script before it's handed to a
//! [`crate::dialog::Dialog`] (spec §4.5). A pluggable registry, the same
//! shape as [`crate::node::NodeRegistry`]: two mandatory checks ship
//! built in, hosts add their own with [`Linter::add_check`].

use crate::machine::DialogMachine;
use crate::node::{Node, NodeRegistry};
use std::fmt;

/// One finding from a lint pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintIssue {
    pub node_id: String,
    pub message: String,
}

impl fmt::Display for LintIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.node_id, self.message)
    }
}

type CheckFn = fn(&DialogMachine) -> Vec<LintIssue>;

/// A registry of whole-script checks. Every check sees the fully built
/// [`DialogMachine`] graph, not individual node definitions, so a check
/// can reason about reachability and destinations across the script.
pub struct Linter {
    checks: Vec<CheckFn>,
}

impl Linter {
    /// The two mandatory checks spec §4.5 names, nothing more.
    pub fn new() -> Self {
        Self { checks: vec![random_branch_has_valid_destinations, branching_prompt_timeout_is_resolvable] }
    }

    pub fn add_check(&mut self, check: CheckFn) -> &mut Self {
        self.checks.push(check);
        self
    }

    pub fn lint(&self, machine: &DialogMachine) -> Vec<LintIssue> {
        self.checks.iter().flat_map(|check| check(machine)).collect()
    }
}

impl Default for Linter {
    fn default() -> Self {
        Self::new()
    }
}

/// Every `random-branch` must have at least one action, every action must
/// name a destination that exists in the script, and none may point back
/// at the branch node itself (an unconditional infinite loop).
fn random_branch_has_valid_destinations(machine: &DialogMachine) -> Vec<LintIssue> {
    let mut issues = Vec::new();
    for id in machine.node_ids() {
        let Some(node) = machine.node(id) else { continue };
        if node.kind() != "random-branch" {
            continue;
        }
        let destinations = node.next_nodes();
        if destinations.is_empty() {
            issues.push(LintIssue { node_id: id.to_string(), message: "random-branch has no actions".to_string() });
            continue;
        }
        for dest in &destinations {
            if dest == id {
                issues.push(LintIssue { node_id: id.to_string(), message: format!("random-branch action loops back to itself ({dest})") });
            } else if machine.node(dest).is_none() {
                issues.push(LintIssue { node_id: id.to_string(), message: format!("random-branch action targets unknown node '{dest}'") });
            }
        }
    }
    issues
}

/// Every `branch-prompt` with a configured timeout must name a
/// `timeout_node_id` that resolves to a real node.
fn branching_prompt_timeout_is_resolvable(machine: &DialogMachine) -> Vec<LintIssue> {
    let mut issues = Vec::new();
    for id in machine.node_ids() {
        let Some(node) = machine.node(id) else { continue };
        if node.kind() != "branch-prompt" {
            continue;
        }
        let def = node.definition();
        let has_timeout = def.get("timeout").and_then(serde_json::Value::as_f64).is_some();
        if !has_timeout {
            continue;
        }
        match def.get("timeout_node_id").and_then(serde_json::Value::as_str) {
            Some(target) if machine.node(target).is_some() => {}
            Some(target) => issues.push(LintIssue { node_id: id.to_string(), message: format!("timeout configured but timeout_node_id '{target}' does not exist") }),
            None => issues.push(LintIssue { node_id: id.to_string(), message: "timeout configured but timeout_node_id is missing".to_string() }),
        }
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use serde_json::json;

    fn machine(definition: Vec<serde_json::Value>) -> DialogMachine {
        DialogMachine::build(&definition, &NodeRegistry::builtin(), &EngineConfig::default()).expect("valid script")
    }

    #[test]
    fn flags_random_branch_self_loop() {
        let m = machine(vec![
            json!({"type": "begin", "id": "b", "next_id": "r"}),
            json!({"type": "random-branch", "id": "r", "actions": [{"action": "r", "weight": 1.0}]}),
        ]);
        let issues = Linter::new().lint(&m);
        assert!(issues.iter().any(|i| i.message.contains("loops back")));
    }

    #[test]
    fn flags_unresolvable_prompt_timeout() {
        let m = machine(vec![
            json!({"type": "begin", "id": "b", "next_id": "p"}),
            json!({"type": "branch-prompt", "id": "p", "prompt": "hi?", "actions": [], "timeout": 5.0, "timeout_node_id": "missing"}),
        ]);
        let issues = Linter::new().lint(&m);
        assert!(issues.iter().any(|i| i.message.contains("does not exist")));
    }

    #[test]
    fn clean_script_has_no_issues() {
        let m = machine(vec![
            json!({"type": "begin", "id": "b", "next_id": "e"}),
            json!({"type": "end", "id": "e"}),
        ]);
        assert!(Linter::new().lint(&m).is_empty());
    }
}
