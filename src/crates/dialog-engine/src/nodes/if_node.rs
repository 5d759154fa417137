use crate::error::{EngineError, Result};
use crate::node::{require_next_id, EvalContext, Node, ParseIssue};
use crate::transition::{Action, Reason, Transition};
use async_trait::async_trait;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Lt,
    Gt,
    Eq,
    Contains,
}

impl Condition {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "<" => Some(Condition::Lt),
            ">" => Some(Condition::Gt),
            "==" => Some(Condition::Eq),
            "contains" => Some(Condition::Contains),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Clause {
    pub key: String,
    pub condition: Condition,
    pub value: Value,
}

/// All clauses must pass (against `dialog.metadata.values`) to route to
/// `next_id`; any failure routes to `false_id`. A missing value is a
/// dialog-fatal error, not a silent `false` (spec §4.3, §7).
#[derive(Debug, Clone)]
pub struct IfNode {
    pub id: String,
    pub node_name: Option<String>,
    pub all_true: Vec<Clause>,
    pub next_id: String,
    pub false_id: String,
}

pub fn parse(def: &Value) -> std::result::Result<Box<dyn Node>, ParseIssue> {
    let id = def.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
    let all_true = def
        .get("all_true")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|c| {
                    Some(Clause {
                        key: c.get("key")?.as_str()?.to_string(),
                        condition: Condition::parse(c.get("condition")?.as_str()?)?,
                        value: c.get("value").cloned().unwrap_or(Value::Null),
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    let next_id = require_next_id(def, "next_id")?;
    let false_id = require_next_id(def, "false_id")?;
    Ok(Box::new(IfNode {
        id,
        node_name: def.get("name").and_then(Value::as_str).map(str::to_string),
        all_true,
        next_id,
        false_id,
    }))
}

fn as_f64(v: &Value) -> Option<f64> {
    v.as_f64().or_else(|| v.as_str().and_then(|s| s.parse().ok()))
}

fn clause_passes(clause: &Clause, actual: &Value) -> bool {
    match clause.condition {
        Condition::Eq => actual == &clause.value,
        Condition::Lt => matches!((as_f64(actual), as_f64(&clause.value)), (Some(a), Some(b)) if a < b),
        Condition::Gt => matches!((as_f64(actual), as_f64(&clause.value)), (Some(a), Some(b)) if a > b),
        Condition::Contains => clause
            .value
            .as_array()
            .map(|candidates| {
                candidates.iter().any(|c| match (actual.as_str(), c.as_str()) {
                    (Some(a), Some(c)) => a.contains(c),
                    _ => actual == c,
                })
            })
            .unwrap_or(false),
    }
}

#[async_trait]
impl Node for IfNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "if"
    }

    fn node_name(&self) -> Option<&str> {
        self.node_name.as_deref()
    }

    async fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Option<Transition>> {
        for clause in &self.all_true {
            let actual = ctx
                .variables
                .get(&clause.key)
                .ok_or_else(|| EngineError::Custom(format!("if-node: missing variable '{}'", clause.key)))?;
            if !clause_passes(clause, &actual) {
                return Ok(Some(Transition::to(self.false_id.clone(), Reason::FailedTest)));
            }
        }
        Ok(Some(Transition::to(self.next_id.clone(), Reason::PassedTest)))
    }

    fn actions(&self) -> Vec<Action> {
        Vec::new()
    }

    fn next_nodes(&self) -> Vec<String> {
        vec![self.next_id.clone(), self.false_id.clone()]
    }

    fn definition(&self) -> Value {
        json!({
            "type": "if",
            "id": self.id,
            "name": self.node_name,
            "all_true": self.all_true.iter().map(|c| json!({
                "key": c.key,
                "condition": match c.condition { Condition::Lt => "<", Condition::Gt => ">", Condition::Eq => "==", Condition::Contains => "contains" },
                "value": c.value,
            })).collect::<Vec<_>>(),
            "next_id": self.next_id,
            "false_id": self.false_id,
        })
    }

    fn prefix(&mut self, prefix: &str) {
        self.id = format!("{prefix}{}", self.id);
        self.next_id = format!("{prefix}{}", self.next_id);
        self.false_id = format!("{prefix}{}", self.false_id);
    }
}
