use crate::error::{EngineError, Result};
use crate::node::{opt_f64, opt_str, require_next_id, require_str, EvalContext, Node, ParseIssue};
use crate::transition::{Action, Reason, Transition};
use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};

/// Echoes `prompt`, waits for input, and validates the response against
/// `valid_patterns` (anchored-at-start regexes). Three phases per spec
/// §4.3: timeout check, response validation, idle self-transition.
#[derive(Debug, Clone)]
pub struct Prompt {
    pub id: String,
    pub node_name: Option<String>,
    pub prompt: String,
    pub valid_patterns: Vec<String>,
    pub timeout: Option<f64>,
    pub timeout_node_id: Option<String>,
    pub invalid_response_node_id: Option<String>,
    pub next_id: String,
}

pub fn parse(def: &Value) -> std::result::Result<Box<dyn Node>, ParseIssue> {
    let id = def.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
    let prompt = require_str(def, "prompt", "prompt")?.to_string();
    let next_id = require_next_id(def, "next_id")?;
    let valid_patterns = def
        .get("valid_patterns")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();
    Ok(Box::new(Prompt {
        id,
        node_name: def.get("name").and_then(Value::as_str).map(str::to_string),
        prompt,
        valid_patterns,
        timeout: opt_f64(def, "timeout"),
        timeout_node_id: opt_str(def, "timeout_node_id"),
        invalid_response_node_id: opt_str(def, "invalid_response_node_id"),
        next_id,
    }))
}

impl Prompt {
    fn is_valid(&self, response: &str) -> Result<bool> {
        if self.valid_patterns.is_empty() {
            return Ok(true);
        }
        for pattern in &self.valid_patterns {
            let re = Regex::new(&format!("^(?:{pattern})"))
                .map_err(|e| EngineError::Custom(format!("invalid valid_pattern '{pattern}': {e}")))?;
            if re.is_match(response) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[async_trait]
impl Node for Prompt {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "prompt"
    }

    fn node_name(&self) -> Option<&str> {
        self.node_name.as_deref()
    }

    async fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Option<Transition>> {
        if ctx.response.is_none() {
            if let (Some(last), Some(timeout_node_id), Some(timeout)) =
                (ctx.last_transition, &self.timeout_node_id, self.timeout)
            {
                if ctx.seconds_since(last.when) > timeout {
                    return Ok(Some(Transition::to(timeout_node_id.clone(), Reason::Timeout)));
                }
            }
            return Ok(Some(Transition::to(self.id.clone(), Reason::PromptInit)));
        }

        let response = ctx.response.unwrap();
        if self.is_valid(response)? {
            let exit = vec![Action::StoreValue { key: self.id.clone(), value: Value::String(response.to_string()) }];
            Ok(Some(Transition::to(self.next_id.clone(), Reason::ValidResponse).with_exit_actions(exit)))
        } else if let Some(invalid_id) = &self.invalid_response_node_id {
            let transition = Transition::to(invalid_id.clone(), Reason::InvalidResponse)
                .with_metadata("response", Value::String(response.to_string()))
                .with_metadata("valid_patterns", json!(self.valid_patterns));
            Ok(Some(transition))
        } else {
            Ok(None)
        }
    }

    fn actions(&self) -> Vec<Action> {
        vec![
            Action::Echo { message: self.prompt.clone() },
            Action::WaitForInput { timeout: self.timeout },
        ]
    }

    fn next_nodes(&self) -> Vec<String> {
        let mut ids = vec![self.next_id.clone()];
        ids.extend(self.timeout_node_id.clone());
        ids.extend(self.invalid_response_node_id.clone());
        ids
    }

    fn definition(&self) -> Value {
        json!({
            "type": "prompt",
            "id": self.id,
            "name": self.node_name,
            "prompt": self.prompt,
            "valid_patterns": self.valid_patterns,
            "timeout": self.timeout,
            "timeout_node_id": self.timeout_node_id,
            "invalid_response_node_id": self.invalid_response_node_id,
            "next_id": self.next_id,
        })
    }

    fn prefix(&mut self, prefix: &str) {
        self.id = format!("{prefix}{}", self.id);
        self.next_id = format!("{prefix}{}", self.next_id);
        crate::node::prefix_opt(&mut self.timeout_node_id, prefix);
        crate::node::prefix_opt(&mut self.invalid_response_node_id, prefix);
    }
}
