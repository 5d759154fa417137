use crate::error::Result;
use crate::node::{require_next_id, EvalContext, Node, ParseIssue};
use crate::transition::{Action, Reason, Transition};
use async_trait::async_trait;
use serde_json::{json, Value};

/// Fires at most once per dialog, via the machine's pre-dispatch scan,
/// once `now - dialog.started >= hours*3600 + minutes*60` seconds.
///
/// Resolves the spec §9 open question: the threshold is a plain quantity
/// (`total_seconds`), and prior-firing is checked against the
/// (correctly spelled) transition log — not the typo'd identifiers one
/// revision of the source carried.
#[derive(Debug, Clone)]
pub struct TimeElapsedInterrupt {
    pub id: String,
    pub node_name: Option<String>,
    pub hours: f64,
    pub minutes: f64,
    pub next_id: String,
}

pub fn parse(def: &Value) -> std::result::Result<Box<dyn Node>, ParseIssue> {
    let id = def.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
    let hours = def.get("hours").and_then(Value::as_f64).unwrap_or(0.0);
    let minutes = def.get("minutes").and_then(Value::as_f64).unwrap_or(0.0);
    let next_id = require_next_id(def, "next_id")?;
    Ok(Box::new(TimeElapsedInterrupt {
        id,
        node_name: def.get("name").and_then(Value::as_str).map(str::to_string),
        hours,
        minutes,
        next_id,
    }))
}

impl TimeElapsedInterrupt {
    pub fn threshold_seconds(&self) -> f64 {
        self.hours * 3600.0 + self.minutes * 60.0
    }

    /// Called by the machine's pre-dispatch scan (spec §4.1), not by
    /// `evaluate` directly: fires when the threshold has elapsed and no
    /// transition into this node has yet been logged.
    pub async fn should_fire(&self, ctx: &EvalContext<'_>) -> Result<bool> {
        if ctx.seconds_since_start() < self.threshold_seconds() {
            return Ok(false);
        }
        let prior = ctx.prior_transitions(&self.id, None, None).await?;
        Ok(prior.is_empty())
    }
}

#[async_trait]
impl Node for TimeElapsedInterrupt {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "time-elapsed-interrupt"
    }

    fn node_name(&self) -> Option<&str> {
        self.node_name.as_deref()
    }

    async fn evaluate(&self, _ctx: &EvalContext<'_>) -> Result<Option<Transition>> {
        Ok(Some(Transition::to(self.next_id.clone(), Reason::InterruptTimeElapsed)))
    }

    fn actions(&self) -> Vec<Action> {
        Vec::new()
    }

    fn next_nodes(&self) -> Vec<String> {
        vec![self.next_id.clone()]
    }

    fn definition(&self) -> Value {
        json!({
            "type": "time-elapsed-interrupt",
            "id": self.id,
            "name": self.node_name,
            "hours": self.hours,
            "minutes": self.minutes,
            "next_id": self.next_id,
        })
    }

    fn prefix(&mut self, prefix: &str) {
        self.id = format!("{prefix}{}", self.id);
        self.next_id = format!("{prefix}{}", self.next_id);
    }

    fn as_time_elapsed_interrupt(&self) -> Option<&TimeElapsedInterrupt> {
        Some(self)
    }
}
