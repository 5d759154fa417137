use crate::error::Result;
use crate::node::{require_next_id, EvalContext, Node, ParseIssue};
use crate::transition::{Action, Reason, Transition};
use async_trait::async_trait;
use serde_json::{json, Value};

/// Entry sentinel. At most one per graph; becomes the machine's initial
/// `current_node`.
#[derive(Debug, Clone)]
pub struct Begin {
    pub id: String,
    pub node_name: Option<String>,
    pub next_id: String,
}

pub fn parse(def: &Value) -> std::result::Result<Box<dyn Node>, ParseIssue> {
    let id = def.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
    let next_id = require_next_id(def, "next_id")?;
    Ok(Box::new(Begin { id, node_name: def.get("name").and_then(Value::as_str).map(str::to_string), next_id }))
}

#[async_trait]
impl Node for Begin {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "begin"
    }

    fn node_name(&self) -> Option<&str> {
        self.node_name.as_deref()
    }

    async fn evaluate(&self, _ctx: &EvalContext<'_>) -> Result<Option<Transition>> {
        Ok(Some(Transition::to(self.next_id.clone(), Reason::BeginDialog)))
    }

    fn actions(&self) -> Vec<Action> {
        Vec::new()
    }

    fn next_nodes(&self) -> Vec<String> {
        vec![self.next_id.clone()]
    }

    fn definition(&self) -> Value {
        json!({"type": "begin", "id": self.id, "name": self.node_name, "next_id": self.next_id})
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
    async fn always_transitions_to_next_id() {
        let begin = Begin { id: "b".to_string(), node_name: None, next_id: "n".to_string() };
        let harness = TestHarness::new(Utc::now());
        let transition = begin.evaluate(&harness.ctx(None, None)).await.unwrap().unwrap();
        assert_eq!(transition.new_state_id.as_deref(), Some("n"));
        assert!(begin.actions().is_empty());
    }

    #[test]
    fn missing_next_id_triggers_sentinel_repair() {
        let err = parse(&json!({"type": "begin", "id": "b"})).err().unwrap();
        assert!(matches!(err, ParseIssue::MissingNextNode { field } if field == "next_id"));
    }

    #[test]
    fn prefix_rewrites_id_and_next_id() {
        let mut begin = Begin { id: "b".to_string(), node_name: None, next_id: "n".to_string() };
        begin.prefix("p_");
        assert_eq!(begin.id, "p_b");
        assert_eq!(begin.next_id, "p_n");
    }
}
