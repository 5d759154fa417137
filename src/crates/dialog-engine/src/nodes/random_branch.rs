use crate::error::Result;
use crate::node::{EvalContext, Node, ParseIssue};
use crate::template;
use crate::transition::{Action, Reason, Transition};
use async_trait::async_trait;
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct WeightedAction {
    pub action: String,
    /// Kept as a [`Value`] because weights may be literal numbers or
    /// template strings (spec §4.3: "renders each weight through the
    /// template engine").
    pub weight: Value,
}

/// Weighted categorical branch, optionally sampling without replacement
/// across repeated visits (spec §4.3).
#[derive(Debug, Clone)]
pub struct RandomBranch {
    pub id: String,
    pub node_name: Option<String>,
    pub actions_list: Vec<WeightedAction>,
    pub without_replacement: bool,
}

pub fn parse(def: &Value) -> std::result::Result<Box<dyn Node>, ParseIssue> {
    let id = def.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
    let actions_list = def
        .get("actions")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|entry| {
                    Some(WeightedAction {
                        action: entry.get("action")?.as_str()?.to_string(),
                        weight: entry.get("weight").cloned().unwrap_or(json!(1.0)),
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    Ok(Box::new(RandomBranch {
        id,
        node_name: def.get("name").and_then(Value::as_str).map(str::to_string),
        actions_list,
        without_replacement: def.get("without_replacement").and_then(Value::as_bool).unwrap_or(false),
    }))
}

impl RandomBranch {
    fn prior_choices_key(&self) -> String {
        format!("__{}_prior_choices", self.id)
    }

    fn resolve_weight(&self, weight: &Value, context: &Value) -> f64 {
        match weight {
            Value::Number(n) => n.as_f64().unwrap_or(1.0),
            Value::String(s) => {
                let rendered = template::render(&Value::String(s.clone()), context, "1.0");
                rendered.as_str().and_then(|s| s.parse().ok()).unwrap_or(1.0)
            }
            _ => 1.0,
        }
    }
}

#[async_trait]
impl Node for RandomBranch {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "random-branch"
    }

    fn node_name(&self) -> Option<&str> {
        self.node_name.as_deref()
    }

    async fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Option<Transition>> {
        let context = template::merge_objects(&Value::Object(ctx.variables.snapshot()), ctx.extras);

        let weighted: Vec<(String, f64)> = self
            .actions_list
            .iter()
            .map(|a| (a.action.clone(), self.resolve_weight(&a.weight, &context)))
            .filter(|(_, w)| *w > 0.0)
            .collect();

        let prior_key = self.prior_choices_key();
        let prior_choices: Vec<String> = ctx
            .variables
            .get(&prior_key)
            .or_else(|| ctx.extras.get(&prior_key).cloned())
            .and_then(|v| v.as_array().map(|a| a.iter().filter_map(|x| x.as_str().map(str::to_string)).collect()))
            .unwrap_or_default();

        let mut candidates: Vec<(String, f64)> = if self.without_replacement {
            let filtered: Vec<(String, f64)> =
                weighted.iter().filter(|(a, _)| !prior_choices.contains(a)).cloned().collect();
            if filtered.is_empty() {
                weighted.clone()
            } else {
                filtered
            }
        } else {
            weighted.clone()
        };

        if candidates.is_empty() {
            candidates = weighted;
        }
        if candidates.is_empty() {
            return Ok(None);
        }

        let chosen = if candidates.len() == 1 {
            candidates[0].0.clone()
        } else {
            let total: f64 = candidates.iter().map(|(_, w)| w).sum();
            if total <= 0.0 {
                let idx = (ctx.rng.next_f64() * candidates.len() as f64) as usize;
                candidates[idx.min(candidates.len() - 1)].0.clone()
            } else {
                let draw = ctx.rng.next_f64() * total;
                let mut acc = 0.0;
                let mut pick = candidates.last().unwrap().0.clone();
                for (action, weight) in &candidates {
                    acc += weight;
                    if draw < acc {
                        pick = action.clone();
                        break;
                    }
                }
                pick
            }
        };

        let mut exit_actions = Vec::new();
        if self.without_replacement {
            let was_reset = {
                let filtered: Vec<&(String, f64)> = weighted.iter().filter(|(a, _)| !prior_choices.contains(a)).collect();
                filtered.is_empty()
            };
            let mut updated = if was_reset { Vec::new() } else { prior_choices };
            updated.push(chosen.clone());
            exit_actions.push(Action::StoreValue { key: prior_key, value: json!(updated) });
        }

        Ok(Some(Transition::to(chosen, Reason::RandomBranch).with_exit_actions(exit_actions)))
    }

    fn actions(&self) -> Vec<Action> {
        Vec::new()
    }

    fn next_nodes(&self) -> Vec<String> {
        self.actions_list.iter().map(|a| a.action.clone()).collect()
    }

    fn definition(&self) -> Value {
        json!({
            "type": "random-branch",
            "id": self.id,
            "name": self.node_name,
            "actions": self.actions_list.iter().map(|a| json!({"action": a.action, "weight": a.weight})).collect::<Vec<_>>(),
            "without_replacement": self.without_replacement,
        })
    }

    fn prefix(&mut self, prefix: &str) {
        self.id = format!("{prefix}{}", self.id);
        for rule in &mut self.actions_list {
            rule.action = format!("{prefix}{}", rule.action);
        }
    }
}
