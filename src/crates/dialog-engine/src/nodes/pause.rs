use crate::error::Result;
use crate::node::{opt_f64, EvalContext, Node, ParseIssue};
use crate::transition::{Action, Reason, Transition};
use async_trait::async_trait;
use serde_json::{json, Value};

/// Waits `duration` seconds (measured from the transition log entry that
/// brought the dialog here) before advancing to `next_id`. Parsed without
/// an explicit `next_id` it defaults to its own id — the shape the
/// embedding expander relies on when splicing a zero-duration pause.
#[derive(Debug, Clone)]
pub struct Pause {
    pub id: String,
    pub node_name: Option<String>,
    pub duration: f64,
    pub next_id: String,
}

pub fn parse(def: &Value) -> std::result::Result<Box<dyn Node>, ParseIssue> {
    let id = def.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
    let duration = opt_f64(def, "duration").unwrap_or(0.0);
    let next_id = def.get("next_id").and_then(Value::as_str).map(str::to_string).unwrap_or_else(|| id.clone());
    Ok(Box::new(Pause { id, node_name: def.get("name").and_then(Value::as_str).map(str::to_string), duration, next_id }))
}

#[async_trait]
impl Node for Pause {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "pause"
    }

    fn node_name(&self) -> Option<&str> {
        self.node_name.as_deref()
    }

    async fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Option<Transition>> {
        let Some(last) = ctx.last_transition else {
            return Ok(None);
        };
        if ctx.seconds_since(last.when) >= self.duration {
            Ok(Some(Transition::to(self.next_id.clone(), Reason::PauseElapsed)))
        } else {
            Ok(None)
        }
    }

    fn actions(&self) -> Vec<Action> {
        vec![Action::Pause { duration: self.duration }]
    }

    fn next_nodes(&self) -> Vec<String> {
        vec![self.next_id.clone()]
    }

    fn definition(&self) -> Value {
        json!({"type": "pause", "id": self.id, "name": self.node_name, "duration": self.duration, "next_id": self.next_id})
    }

    fn prefix(&mut self, prefix: &str) {
        self.id = format!("{prefix}{}", self.id);
        self.next_id = format!("{prefix}{}", self.next_id);
    }
}
