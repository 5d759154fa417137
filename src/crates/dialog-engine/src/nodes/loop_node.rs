use crate::error::Result;
use crate::node::{require_next_id, EvalContext, Node, ParseIssue};
use crate::transition::{Action, Reason, Transition};
use async_trait::async_trait;
use serde_json::{json, Value};

/// Routes to `loop_id` until the transition log shows `iterations` prior
/// visits to this node, then falls through to `next_id` (spec §4.3, §8
/// invariant 7: bounded at `iterations + 1` visits).
#[derive(Debug, Clone)]
pub struct LoopNode {
    pub id: String,
    pub node_name: Option<String>,
    pub iterations: u32,
    pub loop_id: String,
    pub next_id: String,
}

pub fn parse(def: &Value) -> std::result::Result<Box<dyn Node>, ParseIssue> {
    let id = def.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
    let iterations = def.get("iterations").and_then(Value::as_u64).unwrap_or(0) as u32;
    let loop_id = require_next_id(def, "loop_id")?;
    let next_id = require_next_id(def, "next_id")?;
    Ok(Box::new(LoopNode {
        id,
        node_name: def.get("name").and_then(Value::as_str).map(str::to_string),
        iterations,
        loop_id,
        next_id,
    }))
}

#[async_trait]
impl Node for LoopNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "loop"
    }

    fn node_name(&self) -> Option<&str> {
        self.node_name.as_deref()
    }

    async fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Option<Transition>> {
        let visits = ctx.prior_transitions(&self.id, None, None).await?;
        let count = visits.len() as u32;
        if count < self.iterations {
            let transition = Transition::to(self.loop_id.clone(), Reason::NextLoop)
                .with_metadata("loop_iteration", json!(count));
            Ok(Some(transition))
        } else {
            Ok(Some(Transition::to(self.next_id.clone(), Reason::FinishedLoop)))
        }
    }

    fn actions(&self) -> Vec<Action> {
        Vec::new()
    }

    fn next_nodes(&self) -> Vec<String> {
        vec![self.loop_id.clone(), self.next_id.clone()]
    }

    fn definition(&self) -> Value {
        json!({
            "type": "loop",
            "id": self.id,
            "name": self.node_name,
            "iterations": self.iterations,
            "loop_id": self.loop_id,
            "next_id": self.next_id,
        })
    }

    fn prefix(&mut self, prefix: &str) {
        self.id = format!("{prefix}{}", self.id);
        self.loop_id = format!("{prefix}{}", self.loop_id);
        self.next_id = format!("{prefix}{}", self.next_id);
    }
}
