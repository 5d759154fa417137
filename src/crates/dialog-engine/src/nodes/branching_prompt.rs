use crate::error::Result;
use crate::node::{opt_f64, opt_str, require_str, EvalContext, Node, ParseIssue};
use crate::transition::{Action, Reason, Transition};
use async_trait::async_trait;
use regex::RegexBuilder;
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct PatternAction {
    pub pattern: String,
    pub action: String,
}

/// Pattern-matches the response against an ordered list of `{pattern,
/// action}` rules (case-insensitive substring), with optional timeout and
/// a bounded retry count (spec §4.3).
#[derive(Debug, Clone)]
pub struct BranchingPrompt {
    pub id: String,
    pub node_name: Option<String>,
    pub prompt: String,
    pub actions_list: Vec<PatternAction>,
    pub no_match: Option<String>,
    pub timeout: Option<f64>,
    pub timeout_node_id: Option<String>,
    pub timeout_iterations: Option<u32>,
}

pub fn parse(def: &Value) -> std::result::Result<Box<dyn Node>, ParseIssue> {
    let id = def.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
    let prompt = require_str(def, "prompt", "branch-prompt")?.to_string();
    let actions_list = def
        .get("actions")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|entry| {
                    Some(PatternAction {
                        pattern: entry.get("pattern")?.as_str()?.to_string(),
                        action: entry.get("action")?.as_str()?.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    // timeout_node_id is only required when a timeout is configured, so
    // absence here is not a MissingNextNode repair case — it's caught by
    // the linter (spec §4.5) instead.
    Ok(Box::new(BranchingPrompt {
        id,
        node_name: def.get("name").and_then(Value::as_str).map(str::to_string),
        prompt,
        actions_list,
        no_match: opt_str(def, "no_match"),
        timeout: opt_f64(def, "timeout"),
        timeout_node_id: opt_str(def, "timeout_node_id"),
        timeout_iterations: def.get("timeout_iterations").and_then(Value::as_u64).map(|n| n as u32),
    }))
}

/// Resolves the spec §9 open question: store the response under the
/// suffix of the node id after its last `__`, so a response recorded by an
/// embedded copy of this node still lands under the script-author's
/// original variable name.
fn storage_key(node_id: &str) -> &str {
    node_id.rsplit("__").next().unwrap_or(node_id)
}

#[async_trait]
impl Node for BranchingPrompt {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "branch-prompt"
    }

    fn node_name(&self) -> Option<&str> {
        self.node_name.as_deref()
    }

    async fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Option<Transition>> {
        if let Some(response) = ctx.response {
            let trimmed = response.trim();
            for rule in &self.actions_list {
                let re = RegexBuilder::new(&rule.pattern).case_insensitive(true).build();
                if let Ok(re) = re {
                    if re.is_match(trimmed) {
                        let exit = vec![Action::StoreValue {
                            key: storage_key(&self.id).to_string(),
                            value: Value::String(trimmed.to_string()),
                        }];
                        return Ok(Some(
                            Transition::to(rule.action.clone(), Reason::ValidResponse).with_exit_actions(exit),
                        ));
                    }
                }
            }
            return Ok(match &self.no_match {
                Some(no_match) => {
                    let exit = vec![Action::StoreValue {
                        key: storage_key(&self.id).to_string(),
                        value: Value::String(trimmed.to_string()),
                    }];
                    Some(Transition::to(no_match.clone(), Reason::InvalidResponse).with_refresh(true).with_exit_actions(exit))
                }
                None => None,
            });
        }

        if let (Some(timeout_node_id), Some(iterations)) = (&self.timeout_node_id, self.timeout_iterations) {
            if self.timeout.is_some() {
                let prior = ctx.prior_transitions(timeout_node_id, Some(&self.id), Some("timeout")).await?;
                if prior.len() as u32 >= iterations {
                    return Ok(None);
                }
                if let Some(last) = ctx.last_transition {
                    if let Some(timeout) = self.timeout {
                        if ctx.seconds_since(last.when) > timeout {
                            return Ok(Some(Transition::to(timeout_node_id.clone(), Reason::Timeout).with_refresh(true)));
                        }
                    }
                }
            }
        }

        if ctx.last_transition.map(|t| t.state_id.as_str()) != Some(self.id.as_str()) {
            return Ok(Some(Transition::to(self.id.clone(), Reason::PromptInit)));
        }

        Ok(None)
    }

    fn actions(&self) -> Vec<Action> {
        vec![
            Action::Echo { message: self.prompt.clone() },
            Action::WaitForInput { timeout: self.timeout },
        ]
    }

    fn next_nodes(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.actions_list.iter().map(|a| a.action.clone()).collect();
        ids.extend(self.no_match.clone());
        ids.extend(self.timeout_node_id.clone());
        ids
    }

    fn definition(&self) -> Value {
        json!({
            "type": "branch-prompt",
            "id": self.id,
            "name": self.node_name,
            "prompt": self.prompt,
            "actions": self.actions_list.iter().map(|a| json!({"pattern": a.pattern, "action": a.action})).collect::<Vec<_>>(),
            "no_match": self.no_match,
            "timeout": self.timeout,
            "timeout_node_id": self.timeout_node_id,
            "timeout_iterations": self.timeout_iterations,
        })
    }

    fn prefix(&mut self, prefix: &str) {
        self.id = format!("{prefix}{}", self.id);
        for rule in &mut self.actions_list {
            rule.action = format!("{prefix}{}", rule.action);
        }
        crate::node::prefix_opt(&mut self.no_match, prefix);
        crate::node::prefix_opt(&mut self.timeout_node_id, prefix);
    }
}
