use crate::error::Result;
use crate::node::{opt_f64, opt_str, EvalContext, Node, ParseIssue};
use crate::transition::{Action, ChoiceOption, Reason, Transition};
use async_trait::async_trait;
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct IdentifierAction {
    pub identifier: String,
    pub label: String,
    pub action: String,
}

/// Like [`crate::nodes::BranchingPrompt`] but matches exact `identifier`
/// values and only when the host marks the response `extras.is_external`.
#[derive(Debug, Clone)]
pub struct ExternalChoice {
    pub id: String,
    pub node_name: Option<String>,
    pub actions_list: Vec<IdentifierAction>,
    pub timeout: Option<f64>,
    pub timeout_node_id: Option<String>,
}

pub fn parse(def: &Value) -> std::result::Result<Box<dyn Node>, ParseIssue> {
    let id = def.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
    let actions_list = def
        .get("actions")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|entry| {
                    Some(IdentifierAction {
                        identifier: entry.get("identifier")?.as_str()?.to_string(),
                        label: entry.get("label")?.as_str()?.to_string(),
                        action: entry.get("action")?.as_str()?.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    Ok(Box::new(ExternalChoice {
        id,
        node_name: def.get("name").and_then(Value::as_str).map(str::to_string),
        actions_list,
        timeout: opt_f64(def, "timeout"),
        timeout_node_id: opt_str(def, "timeout_node_id"),
    }))
}

#[async_trait]
impl Node for ExternalChoice {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "external-choice"
    }

    fn node_name(&self) -> Option<&str> {
        self.node_name.as_deref()
    }

    async fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Option<Transition>> {
        let is_external = ctx.extras.get("is_external").and_then(Value::as_bool).unwrap_or(false);
        if is_external {
            if let Some(response) = ctx.response {
                if let Some(choice) = self.actions_list.iter().find(|c| c.identifier == response) {
                    return Ok(Some(Transition::to(choice.action.clone(), Reason::ValidChoice)));
                }
            }
        }

        if let (Some(last), Some(timeout_node_id), Some(timeout)) =
            (ctx.last_transition, &self.timeout_node_id, self.timeout)
        {
            if ctx.response.is_none() && ctx.seconds_since(last.when) > timeout {
                return Ok(Some(Transition::to(timeout_node_id.clone(), Reason::Timeout)));
            }
        }

        if ctx.last_transition.map(|t| t.state_id.as_str()) != Some(self.id.as_str()) {
            return Ok(Some(Transition::to(self.id.clone(), Reason::ChoiceInit)));
        }

        Ok(None)
    }

    fn actions(&self) -> Vec<Action> {
        vec![Action::ExternalChoice {
            choices: self
                .actions_list
                .iter()
                .map(|c| ChoiceOption { identifier: c.identifier.clone(), label: c.label.clone() })
                .collect(),
        }]
    }

    fn next_nodes(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.actions_list.iter().map(|a| a.action.clone()).collect();
        ids.extend(self.timeout_node_id.clone());
        ids
    }

    fn definition(&self) -> Value {
        json!({
            "type": "external-choice",
            "id": self.id,
            "name": self.node_name,
            "actions": self.actions_list.iter().map(|a| json!({
                "identifier": a.identifier, "label": a.label, "action": a.action,
            })).collect::<Vec<_>>(),
            "timeout": self.timeout,
            "timeout_node_id": self.timeout_node_id,
        })
    }

    fn prefix(&mut self, prefix: &str) {
        self.id = format!("{prefix}{}", self.id);
        for rule in &mut self.actions_list {
            rule.action = format!("{prefix}{}", rule.action);
        }
        crate::node::prefix_opt(&mut self.timeout_node_id, prefix);
    }
}
