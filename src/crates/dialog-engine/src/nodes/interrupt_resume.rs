use crate::error::Result;
use crate::node::{EvalContext, Node, ParseIssue};
use crate::transition::{Action, Reason, Transition};
use crate::variables::INTERRUPT_STACK_KEY;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Pops the interrupt stack once (or, with `force_top`, all the way to the
/// last non-null entry) and routes back to the popped state (spec §4.3).
#[derive(Debug, Clone)]
pub struct InterruptResume {
    pub id: String,
    pub node_name: Option<String>,
    pub force_top: bool,
}

pub fn parse(def: &Value) -> std::result::Result<Box<dyn Node>, ParseIssue> {
    let id = def.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
    Ok(Box::new(InterruptResume {
        id,
        node_name: def.get("name").and_then(Value::as_str).map(str::to_string),
        force_top: def.get("force_top").and_then(Value::as_bool).unwrap_or(false),
    }))
}

#[async_trait]
impl Node for InterruptResume {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "interrupt-resume"
    }

    fn node_name(&self) -> Option<&str> {
        self.node_name.as_deref()
    }

    async fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Option<Transition>> {
        let mut destination = ctx.variables.pop(INTERRUPT_STACK_KEY).and_then(|v| v.as_str().map(str::to_string));
        if self.force_top {
            while let Some(next) = ctx.variables.pop(INTERRUPT_STACK_KEY) {
                if let Some(s) = next.as_str() {
                    destination = Some(s.to_string());
                }
            }
        }
        Ok(destination.map(|dest| Transition::to(dest, Reason::InterruptResume)))
    }

    fn actions(&self) -> Vec<Action> {
        Vec::new()
    }

    fn next_nodes(&self) -> Vec<String> {
        Vec::new()
    }

    fn definition(&self) -> Value {
        json!({"type": "interrupt-resume", "id": self.id, "name": self.node_name, "force_top": self.force_top})
    }

    fn prefix(&mut self, prefix: &str) {
        self.id = format!("{prefix}{}", self.id);
    }
}
