use crate::error::Result;
use crate::expr::Expr;
use crate::node::{opt_str, EvalContext, Node, ParseIssue};
use crate::template;
use crate::transition::{Action, Reason, Transition};
use async_trait::async_trait;
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct ConditionAction {
    pub condition: Expr,
    pub action: String,
}

/// Evaluates a list of restricted-grammar conditions against
/// `(variables ∪ extras)` in order; first truthy wins. An undefined-symbol
/// lookup collapses to `no_match` rather than failing the dialog (spec
/// §4.3's "NameError-like" carve-out) — this grammar has no other failure
/// mode, so `error` is accepted for schema compatibility but never taken.
#[derive(Debug, Clone)]
pub struct BranchingConditions {
    pub id: String,
    pub node_name: Option<String>,
    pub actions_list: Vec<ConditionAction>,
    pub no_match: Option<String>,
    pub error: Option<String>,
}

pub fn parse(def: &Value) -> std::result::Result<Box<dyn Node>, ParseIssue> {
    let id = def.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
    let actions_list = def
        .get("actions")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|entry| {
                    let condition: Expr = serde_json::from_value(entry.get("condition")?.clone()).ok()?;
                    Some(ConditionAction { condition, action: entry.get("action")?.as_str()?.to_string() })
                })
                .collect()
        })
        .unwrap_or_default();
    Ok(Box::new(BranchingConditions {
        id,
        node_name: def.get("name").and_then(Value::as_str).map(str::to_string),
        actions_list,
        no_match: opt_str(def, "no_match"),
        error: opt_str(def, "error"),
    }))
}

#[async_trait]
impl Node for BranchingConditions {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "branch-conditions"
    }

    fn node_name(&self) -> Option<&str> {
        self.node_name.as_deref()
    }

    async fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Option<Transition>> {
        let context = template::merge_objects(&Value::Object(ctx.variables.snapshot()), ctx.extras);

        for rule in &self.actions_list {
            match rule.condition.eval(&context) {
                Ok(true) => return Ok(Some(Transition::to(rule.action.clone(), Reason::MatchedCondition))),
                Ok(false) => continue,
                Err(_undefined_symbol) => continue,
            }
        }

        Ok(match &self.no_match {
            Some(no_match) => Some(Transition::to(no_match.clone(), Reason::NoMatchingConditions)),
            None => None,
        })
    }

    fn actions(&self) -> Vec<Action> {
        Vec::new()
    }

    fn next_nodes(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.actions_list.iter().map(|a| a.action.clone()).collect();
        ids.extend(self.no_match.clone());
        ids.extend(self.error.clone());
        ids
    }

    fn definition(&self) -> Value {
        json!({
            "type": "branch-conditions",
            "id": self.id,
            "name": self.node_name,
            "actions": self.actions_list.iter().map(|a| json!({
                "condition": serde_json::to_value(&a.condition).unwrap_or(Value::Null),
                "action": a.action,
            })).collect::<Vec<_>>(),
            "no_match": self.no_match,
            "error": self.error,
        })
    }

    fn prefix(&mut self, prefix: &str) {
        self.id = format!("{prefix}{}", self.id);
        for rule in &mut self.actions_list {
            rule.action = format!("{prefix}{}", rule.action);
        }
        crate::node::prefix_opt(&mut self.no_match, prefix);
        crate::node::prefix_opt(&mut self.error, prefix);
    }
}
