use crate::error::Result;
use crate::node::{require_next_id, require_str, EvalContext, Node, ParseIssue};
use crate::transition::{Action, Reason, Transition};
use async_trait::async_trait;
use serde_json::{json, Value};

/// References a sub-script by id. Ordinarily the embedding expander
/// (spec §4.3, §4.4) resolves and inlines this node's target entirely
/// during snapshot construction, so it never reaches `evaluate` in a
/// well-formed script. If resolution failed, the expander leaves this node
/// in place and records why in `resolution_error`; `evaluate` then falls
/// through to `next_id` carrying that message.
#[derive(Debug, Clone)]
pub struct EmbedDialog {
    pub id: String,
    pub node_name: Option<String>,
    pub script_id: String,
    pub next_id: String,
    pub resolution_error: Option<String>,
}

pub fn parse(def: &Value) -> std::result::Result<Box<dyn Node>, ParseIssue> {
    let id = def.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
    let script_id = require_str(def, "script_id", "embed-dialog")?.to_string();
    let next_id = require_next_id(def, "next_id")?;
    Ok(Box::new(EmbedDialog {
        id,
        node_name: def.get("name").and_then(Value::as_str).map(str::to_string),
        script_id,
        next_id,
        resolution_error: def.get("resolution_error").and_then(Value::as_str).map(str::to_string),
    }))
}

#[async_trait]
impl Node for EmbedDialog {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "embed-dialog"
    }

    fn node_name(&self) -> Option<&str> {
        self.node_name.as_deref()
    }

    async fn evaluate(&self, _ctx: &EvalContext<'_>) -> Result<Option<Transition>> {
        let mut transition = Transition::to(self.next_id.clone(), Reason::EmbedDialogContinue);
        if let Some(error) = &self.resolution_error {
            transition = transition.with_metadata("error", json!(error));
        }
        Ok(Some(transition))
    }

    fn actions(&self) -> Vec<Action> {
        Vec::new()
    }

    fn next_nodes(&self) -> Vec<String> {
        vec![self.next_id.clone()]
    }

    fn definition(&self) -> Value {
        json!({
            "type": "embed-dialog",
            "id": self.id,
            "name": self.node_name,
            "script_id": self.script_id,
            "next_id": self.next_id,
            "resolution_error": self.resolution_error,
        })
    }

    fn prefix(&mut self, prefix: &str) {
        self.id = format!("{prefix}{}", self.id);
        self.next_id = format!("{prefix}{}", self.next_id);
    }
}
