use crate::error::Result;
use crate::node::{opt_f64, opt_str, require_str, EvalContext, Node, ParseIssue};
use crate::template;
use crate::transition::{Action, Reason, Transition};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Method;
use scraper::{Html, Selector};
use serde_json::{json, Value};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternMatcher {
    Re,
    JsonPath,
    Xpath,
}

#[derive(Debug, Clone)]
pub struct MatchRule {
    pub pattern: String,
    pub action: String,
}

/// The sole node that performs network I/O (spec §4.3, §5). Issues one
/// synchronous request, then tests `actions` rules against the response
/// body with the configured matcher.
///
/// `xpath` is implemented with CSS selectors via `scraper` rather than a
/// true XPath engine — no XPath crate surfaced in the reference stack, and
/// CSS selectors cover the common "does this element exist" case the
/// source's xpath matcher is used for in practice. `jsonpath` is a small
/// dotted-path subset (`$.a.b`), not the full JSONPath grammar: a rule
/// matches when the path resolves to a truthy value in the parsed body.
#[derive(Debug, Clone)]
pub struct HttpResponseBranch {
    pub id: String,
    pub node_name: Option<String>,
    pub url: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub parameters: Vec<(String, String)>,
    pub pattern_matcher: PatternMatcher,
    pub actions_list: Vec<MatchRule>,
    pub no_match: Option<String>,
    pub timeout: Option<f64>,
    pub timeout_node_id: Option<String>,
}

fn pairs(def: &Value, field: &str) -> Vec<(String, String)> {
    def.get(field)
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|e| {
                    Some((e.get("key")?.as_str()?.to_string(), e.get("value")?.as_str().unwrap_or_default().to_string()))
                })
                .collect()
        })
        .unwrap_or_default()
}

pub fn parse(def: &Value) -> std::result::Result<Box<dyn Node>, ParseIssue> {
    let id = def.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
    let url = require_str(def, "url", "http-response-branch")?.to_string();
    let method = def.get("method").and_then(Value::as_str).unwrap_or("GET").to_string();
    let pattern_matcher = match def.get("pattern_matcher").and_then(Value::as_str).unwrap_or("re") {
        "jsonpath" => PatternMatcher::JsonPath,
        "xpath" => PatternMatcher::Xpath,
        _ => PatternMatcher::Re,
    };
    let actions_list = def
        .get("actions")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|e| Some(MatchRule { pattern: e.get("pattern")?.as_str()?.to_string(), action: e.get("action")?.as_str()?.to_string() }))
                .collect()
        })
        .unwrap_or_default();
    Ok(Box::new(HttpResponseBranch {
        id,
        node_name: def.get("name").and_then(Value::as_str).map(str::to_string),
        url,
        method,
        headers: pairs(def, "headers"),
        parameters: pairs(def, "parameters"),
        pattern_matcher,
        actions_list,
        no_match: opt_str(def, "no_match"),
        timeout: opt_f64(def, "timeout"),
        timeout_node_id: opt_str(def, "timeout_node_id"),
    }))
}

impl HttpResponseBranch {
    fn matches(&self, rule: &MatchRule, text: &str) -> bool {
        match self.pattern_matcher {
            PatternMatcher::Re => Regex::new(&rule.pattern).map(|re| re.is_match(text)).unwrap_or(false),
            PatternMatcher::JsonPath => {
                let path = rule.pattern.trim_start_matches("$.");
                serde_json::from_str::<Value>(text)
                    .ok()
                    .and_then(|v| template::lookup(&v, path))
                    .map(|v| is_truthy(&v))
                    .unwrap_or(false)
            }
            PatternMatcher::Xpath => Selector::parse(&rule.pattern)
                .map(|sel| Html::parse_document(text).select(&sel).next().is_some())
                .unwrap_or(false),
        }
    }
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
    }
}

#[async_trait]
impl Node for HttpResponseBranch {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "http-response-branch"
    }

    fn node_name(&self) -> Option<&str> {
        self.node_name.as_deref()
    }

    async fn evaluate(&self, _ctx: &EvalContext<'_>) -> Result<Option<Transition>> {
        let timeout = Duration::from_secs_f64(self.timeout.unwrap_or(10.0));
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        let method = Method::from_bytes(self.method.to_uppercase().as_bytes()).unwrap_or(Method::GET);
        let mut request = client.request(method, &self.url);
        for (k, v) in &self.headers {
            request = request.header(k, v);
        }
        if !self.parameters.is_empty() {
            request = request.query(&self.parameters);
        }

        let response = match request.send().await {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() => {
                return Ok(self.timeout_node_id.clone().map(|dest| Transition::to(dest, Reason::Timeout).with_refresh(true)));
            }
            Err(e) => {
                tracing::warn!(node = self.id, error = %e, "http-response-branch request failed");
                return Ok(self
                    .no_match
                    .clone()
                    .map(|dest| Transition::to(dest, Reason::Error).with_refresh(true).with_metadata("error", json!(e.to_string()))));
            }
        };

        if !response.status().is_success() {
            return Ok(self
                .no_match
                .clone()
                .map(|dest| Transition::to(dest, Reason::Error).with_refresh(true).with_metadata("error", json!(response.status().as_u16()))));
        }

        let text = response.text().await.unwrap_or_default();
        for rule in &self.actions_list {
            if self.matches(rule, &text) {
                return Ok(Some(Transition::to(rule.action.clone(), Reason::MatchedCondition)));
            }
        }

        Ok(self.no_match.clone().map(|dest| Transition::to(dest, Reason::NoMatchingConditions).with_refresh(true)))
    }

    fn actions(&self) -> Vec<Action> {
        Vec::new()
    }

    fn next_nodes(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.actions_list.iter().map(|a| a.action.clone()).collect();
        ids.extend(self.no_match.clone());
        ids.extend(self.timeout_node_id.clone());
        ids
    }

    fn definition(&self) -> Value {
        json!({
            "type": "http-response-branch",
            "id": self.id,
            "name": self.node_name,
            "url": self.url,
            "method": self.method,
            "headers": self.headers.iter().map(|(k,v)| json!({"key": k, "value": v})).collect::<Vec<_>>(),
            "parameters": self.parameters.iter().map(|(k,v)| json!({"key": k, "value": v})).collect::<Vec<_>>(),
            "pattern_matcher": match self.pattern_matcher { PatternMatcher::Re => "re", PatternMatcher::JsonPath => "jsonpath", PatternMatcher::Xpath => "xpath" },
            "actions": self.actions_list.iter().map(|a| json!({"pattern": a.pattern, "action": a.action})).collect::<Vec<_>>(),
            "no_match": self.no_match,
            "timeout": self.timeout,
            "timeout_node_id": self.timeout_node_id,
        })
    }

    fn prefix(&mut self, prefix: &str) {
        self.id = format!("{prefix}{}", self.id);
        for rule in &mut self.actions_list {
            rule.action = format!("{prefix}{}", rule.action);
        }
        crate::node::prefix_opt(&mut self.no_match, prefix);
        crate::node::prefix_opt(&mut self.timeout_node_id, prefix);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> HttpResponseBranch {
        HttpResponseBranch {
            id: "h".to_string(),
            node_name: None,
            url: "http://example.invalid".to_string(),
            method: "GET".to_string(),
            headers: Vec::new(),
            parameters: Vec::new(),
            pattern_matcher: PatternMatcher::JsonPath,
            actions_list: vec![MatchRule { pattern: "$.status".to_string(), action: "ok".to_string() }],
            no_match: Some("no_match".to_string()),
            timeout: None,
            timeout_node_id: None,
        }
    }

    // Exercises the jsonpath matcher directly against response bodies
    // rather than a live request: `{"status":"ok"}` resolves the path to a
    // truthy value and matches, an empty object does not.
    #[test]
    fn jsonpath_matches_truthy_path() {
        let n = node();
        let rule = &n.actions_list[0];
        assert!(n.matches(rule, r#"{"status":"ok"}"#));
        assert!(!n.matches(rule, "{}"));
    }

    #[test]
    fn regex_matcher_matches_raw_body() {
        let mut n = node();
        n.pattern_matcher = PatternMatcher::Re;
        n.actions_list = vec![MatchRule { pattern: "^ok$".to_string(), action: "ok".to_string() }];
        assert!(n.matches(&n.actions_list[0], "ok"));
        assert!(!n.matches(&n.actions_list[0], "not-ok"));
    }

    #[test]
    fn xpath_matcher_uses_css_selector_against_html() {
        let mut n = node();
        n.pattern_matcher = PatternMatcher::Xpath;
        n.actions_list = vec![MatchRule { pattern: "div.success".to_string(), action: "ok".to_string() }];
        assert!(n.matches(&n.actions_list[0], "<html><body><div class=\"success\">ok</div></body></html>"));
        assert!(!n.matches(&n.actions_list[0], "<html><body></body></html>"));
    }
}
