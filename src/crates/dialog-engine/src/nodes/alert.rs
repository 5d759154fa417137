use crate::error::Result;
use crate::node::{require_next_id, require_str, EvalContext, Node, ParseIssue};
use crate::transition::{Action, Reason, Transition};
use async_trait::async_trait;
use serde_json::{json, Value};

/// Like [`crate::nodes::Echo`] but emits `raise-alert` instead of `echo`.
#[derive(Debug, Clone)]
pub struct Alert {
    pub id: String,
    pub node_name: Option<String>,
    pub message: String,
    pub next_id: String,
}

pub fn parse(def: &Value) -> std::result::Result<Box<dyn Node>, ParseIssue> {
    let id = def.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
    let message = require_str(def, "message", "alert")?.to_string();
    let next_id = require_next_id(def, "next_id")?;
    Ok(Box::new(Alert { id, node_name: def.get("name").and_then(Value::as_str).map(str::to_string), message, next_id }))
}

#[async_trait]
impl Node for Alert {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "alert"
    }

    fn node_name(&self) -> Option<&str> {
        self.node_name.as_deref()
    }

    async fn evaluate(&self, _ctx: &EvalContext<'_>) -> Result<Option<Transition>> {
        Ok(Some(Transition::to(self.next_id.clone(), Reason::AlertContinue)))
    }

    fn actions(&self) -> Vec<Action> {
        vec![Action::RaiseAlert { message: self.message.clone() }]
    }

    fn next_nodes(&self) -> Vec<String> {
        vec![self.next_id.clone()]
    }

    fn definition(&self) -> Value {
        json!({"type": "alert", "id": self.id, "name": self.node_name, "message": self.message, "next_id": self.next_id})
    }

    fn prefix(&mut self, prefix: &str) {
        self.id = format!("{prefix}{}", self.id);
        self.next_id = format!("{prefix}{}", self.next_id);
    }
}
