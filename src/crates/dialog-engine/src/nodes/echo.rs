use crate::error::Result;
use crate::node::{require_next_id, require_str, EvalContext, Node, ParseIssue};
use crate::transition::{Action, Reason, Transition};
use async_trait::async_trait;
use serde_json::{json, Value};

/// Emits `{type: echo, message}` then advances. Missing `next_id` triggers
/// sentinel repair at parse time (spec §4.3).
#[derive(Debug, Clone)]
pub struct Echo {
    pub id: String,
    pub node_name: Option<String>,
    pub message: String,
    pub next_id: String,
}

pub fn parse(def: &Value) -> std::result::Result<Box<dyn Node>, ParseIssue> {
    let id = def.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
    let message = require_str(def, "message", "echo")?.to_string();
    let next_id = require_next_id(def, "next_id")?;
    Ok(Box::new(Echo { id, node_name: def.get("name").and_then(Value::as_str).map(str::to_string), message, next_id }))
}

#[async_trait]
impl Node for Echo {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "echo"
    }

    fn node_name(&self) -> Option<&str> {
        self.node_name.as_deref()
    }

    async fn evaluate(&self, _ctx: &EvalContext<'_>) -> Result<Option<Transition>> {
        Ok(Some(Transition::to(self.next_id.clone(), Reason::EchoContinue)))
    }

    fn actions(&self) -> Vec<Action> {
        vec![Action::Echo { message: self.message.clone() }]
    }

    fn next_nodes(&self) -> Vec<String> {
        vec![self.next_id.clone()]
    }

    fn definition(&self) -> Value {
        json!({"type": "echo", "id": self.id, "name": self.node_name, "message": self.message, "next_id": self.next_id})
    }

    fn prefix(&mut self, prefix: &str) {
        self.id = format!("{prefix}{}", self.id);
        self.next_id = format!("{prefix}{}", self.next_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestHarness;
    use chrono::Utc;

    #[tokio::test]
    async fn emits_message_and_advances() {
        let echo = Echo { id: "e".to_string(), node_name: None, message: "hi".to_string(), next_id: "n".to_string() };
        let harness = TestHarness::new(Utc::now());
        let transition = echo.evaluate(&harness.ctx(None, None)).await.unwrap().unwrap();
        assert_eq!(transition.new_state_id.as_deref(), Some("n"));
        assert_eq!(echo.actions(), vec![Action::Echo { message: "hi".to_string() }]);
    }

    #[test]
    fn missing_message_is_rejected() {
        let err = parse(&json!({"type": "echo", "id": "e", "next_id": "n"})).err().unwrap();
        assert!(matches!(err, ParseIssue::Other(_)));
    }
}
