use crate::error::Result;
use crate::node::{EvalContext, Node, ParseIssue};
use crate::transition::{Action, Reason, Transition};
use async_trait::async_trait;
use serde_json::{json, Value};

/// Terminal node. `next_nodes()` is empty by design — nothing points
/// forward from here.
#[derive(Debug, Clone)]
pub struct End {
    pub id: String,
    pub node_name: Option<String>,
}

pub fn parse(def: &Value) -> std::result::Result<Box<dyn Node>, ParseIssue> {
    let id = def.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
    Ok(Box::new(End { id, node_name: def.get("name").and_then(Value::as_str).map(str::to_string) }))
}

#[async_trait]
impl Node for End {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "end"
    }

    fn node_name(&self) -> Option<&str> {
        self.node_name.as_deref()
    }

    async fn evaluate(&self, _ctx: &EvalContext<'_>) -> Result<Option<Transition>> {
        Ok(Some(Transition::terminate(Reason::EndDialog)))
    }

    fn actions(&self) -> Vec<Action> {
        Vec::new()
    }

    fn next_nodes(&self) -> Vec<String> {
        Vec::new()
    }

    fn definition(&self) -> Value {
        json!({"type": "end", "id": self.id, "name": self.node_name})
    }

    fn prefix(&mut self, prefix: &str) {
        self.id = format!("{prefix}{}", self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestHarness;
    use chrono::Utc;

    #[tokio::test]
    async fn terminates_with_no_destination() {
        let end = End { id: "e".to_string(), node_name: None };
        let harness = TestHarness::new(Utc::now());
        let transition = end.evaluate(&harness.ctx(None, None)).await.unwrap().unwrap();
        assert!(transition.new_state_id.is_none());
        assert!(end.next_nodes().is_empty());
    }
}
