use crate::error::Result;
use crate::node::{require_next_id, EvalContext, Node, ParseIssue};
use crate::transition::{Action, Reason, Transition};
use crate::variables::INTERRUPT_STACK_KEY;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Cross-cutting pre-emption rule. Only ever dispatched as *current node*
/// after the machine's pre-dispatch scan routes here on a pattern match
/// (spec §4.1, §4.3); `evaluate` pushes the state we pre-empted onto the
/// resumption stack and hands off to `next_id`.
#[derive(Debug, Clone)]
pub struct Interrupt {
    pub id: String,
    pub node_name: Option<String>,
    pub match_patterns: Vec<String>,
    pub next_id: String,
}

pub fn parse(def: &Value) -> std::result::Result<Box<dyn Node>, ParseIssue> {
    let id = def.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
    let match_patterns = def
        .get("match_patterns")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();
    let next_id = require_next_id(def, "next_id")?;
    Ok(Box::new(Interrupt { id, node_name: def.get("name").and_then(Value::as_str).map(str::to_string), match_patterns, next_id }))
}

#[async_trait]
impl Node for Interrupt {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "interrupt"
    }

    fn node_name(&self) -> Option<&str> {
        self.node_name.as_deref()
    }

    async fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Option<Transition>> {
        let resume_to = ctx.last_transition.and_then(|t| t.prior_state_id.clone());
        if let Some(resume_to) = resume_to {
            ctx.variables.push(INTERRUPT_STACK_KEY, Value::String(resume_to));
        }
        Ok(Some(Transition::to(self.next_id.clone(), Reason::InterruptContinue)))
    }

    fn actions(&self) -> Vec<Action> {
        Vec::new()
    }

    fn next_nodes(&self) -> Vec<String> {
        vec![self.next_id.clone()]
    }

    fn definition(&self) -> Value {
        json!({
            "type": "interrupt",
            "id": self.id,
            "name": self.node_name,
            "match_patterns": self.match_patterns,
            "next_id": self.next_id,
        })
    }

    fn prefix(&mut self, prefix: &str) {
        self.id = format!("{prefix}{}", self.id);
        self.next_id = format!("{prefix}{}", self.next_id);
    }

    fn interrupt_patterns(&self) -> Option<&[String]> {
        Some(&self.match_patterns)
    }
}
