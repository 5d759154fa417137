use crate::error::Result;
use crate::expr::Expr;
use crate::node::{require_next_id, EvalContext, Node, ParseIssue};
use crate::template;
use crate::transition::{Action, Reason, Transition};
use async_trait::async_trait;
use serde_json::{json, Map, Value};

/// The `custom` node, restricted-grammar flavor (spec §4.3, §9: "restrict
/// `custom` to a small, explicit expression grammar" — the strategy
/// `SPEC_FULL.md` records as chosen over embedding a scripting language).
/// `condition` is evaluated against `(variables ∪ extras)`; a true result
/// routes to `true_id` with `true_details` as transition metadata, a false
/// result to `false_id` with `false_details`. A failed lookup (the
/// grammar's only failure mode) produces a `dialog-error` transition
/// rather than propagating, mirroring the source's script-exception path.
#[derive(Debug, Clone)]
pub struct Custom {
    pub id: String,
    pub node_name: Option<String>,
    pub condition: Expr,
    pub true_id: String,
    pub true_details: Map<String, Value>,
    pub false_id: String,
    pub false_details: Map<String, Value>,
    pub actions_list: Vec<Action>,
}

pub fn parse(def: &Value) -> std::result::Result<Box<dyn Node>, ParseIssue> {
    let id = def.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
    let condition: Expr = serde_json::from_value(def.get("condition").cloned().unwrap_or(json!({"op": "literal", "literal": true})))
        .map_err(|e| ParseIssue::Other(crate::error::EngineError::Custom(format!("custom: bad condition: {e}"))))?;
    let true_id = require_next_id(def, "true_id")?;
    let false_id = require_next_id(def, "false_id")?;
    let actions_list = def
        .get("actions")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(|v| serde_json::from_value(v.clone()).ok()).collect())
        .unwrap_or_default();
    Ok(Box::new(Custom {
        id,
        node_name: def.get("name").and_then(Value::as_str).map(str::to_string),
        condition,
        true_id,
        true_details: def.get("true_details").and_then(Value::as_object).cloned().unwrap_or_default(),
        false_id,
        false_details: def.get("false_details").and_then(Value::as_object).cloned().unwrap_or_default(),
        actions_list,
    }))
}

#[async_trait]
impl Node for Custom {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "custom"
    }

    fn node_name(&self) -> Option<&str> {
        self.node_name.as_deref()
    }

    async fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Option<Transition>> {
        let context = template::merge_objects(&Value::Object(ctx.variables.snapshot()), ctx.extras);
        match self.condition.eval(&context) {
            Ok(true) => Ok(Some(Transition { new_state_id: Some(self.true_id.clone()), reason: None, metadata: self.true_details.clone(), ..Default::default() })),
            Ok(false) => Ok(Some(Transition { new_state_id: Some(self.false_id.clone()), reason: None, metadata: self.false_details.clone(), ..Default::default() })),
            Err(e) => {
                let transition = Transition::terminate(Reason::DialogError).with_metadata("error", json!(e.to_string()));
                Ok(Some(transition))
            }
        }
    }

    fn actions(&self) -> Vec<Action> {
        self.actions_list.clone()
    }

    fn next_nodes(&self) -> Vec<String> {
        vec![self.true_id.clone(), self.false_id.clone()]
    }

    fn definition(&self) -> Value {
        json!({
            "type": "custom",
            "id": self.id,
            "name": self.node_name,
            "condition": serde_json::to_value(&self.condition).unwrap_or(Value::Null),
            "true_id": self.true_id,
            "true_details": self.true_details,
            "false_id": self.false_id,
            "false_details": self.false_details,
            "actions": self.actions_list,
        })
    }

    fn prefix(&mut self, prefix: &str) {
        self.id = format!("{prefix}{}", self.id);
        self.true_id = format!("{prefix}{}", self.true_id);
        self.false_id = format!("{prefix}{}", self.false_id);
    }
}
