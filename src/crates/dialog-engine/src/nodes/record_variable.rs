use crate::error::Result;
use crate::node::{require_next_id, require_str, EvalContext, Node, ParseIssue};
use crate::transition::{Action, Reason, Transition};
use async_trait::async_trait;
use serde_json::{json, Value};

/// Unconditionally stores `value` under `key` via a `store-value` exit
/// action (spec §4.3) and advances.
#[derive(Debug, Clone)]
pub struct RecordVariable {
    pub id: String,
    pub node_name: Option<String>,
    pub key: String,
    pub value: Value,
    pub next_id: String,
}

pub fn parse(def: &Value) -> std::result::Result<Box<dyn Node>, ParseIssue> {
    let id = def.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
    let key = require_str(def, "key", "record-variable")?.to_string();
    let value = def.get("value").cloned().unwrap_or(Value::Null);
    let next_id = require_next_id(def, "next_id")?;
    Ok(Box::new(RecordVariable { id, node_name: def.get("name").and_then(Value::as_str).map(str::to_string), key, value, next_id }))
}

#[async_trait]
impl Node for RecordVariable {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "record-variable"
    }

    fn node_name(&self) -> Option<&str> {
        self.node_name.as_deref()
    }

    async fn evaluate(&self, _ctx: &EvalContext<'_>) -> Result<Option<Transition>> {
        let exit = vec![Action::StoreValue { key: self.key.clone(), value: self.value.clone() }];
        Ok(Some(Transition::to(self.next_id.clone(), Reason::SetVariableContinue).with_exit_actions(exit)))
    }

    fn actions(&self) -> Vec<Action> {
        Vec::new()
    }

    fn next_nodes(&self) -> Vec<String> {
        vec![self.next_id.clone()]
    }

    fn definition(&self) -> Value {
        json!({
            "type": "record-variable",
            "id": self.id,
            "name": self.node_name,
            "key": self.key,
            "value": self.value,
            "next_id": self.next_id,
        })
    }

    fn prefix(&mut self, prefix: &str) {
        self.id = format!("{prefix}{}", self.id);
        self.next_id = format!("{prefix}{}", self.next_id);
    }
}
