//! Minimal `{{ key }}` template rendering for action payloads (spec §9:
//! "Pick a host template library or implement a minimal substitution...
//! Errors must be recoverable").
//!
//! Strings, lists, and mappings are walked recursively; only string leaves
//! are substituted. A reference can use dotted paths (`user.name`) to reach
//! into nested objects of the render context. An unresolvable reference
//! does not fail the whole render: the placeholder is replaced with the
//! engine's configured fallback text and a `tracing` warning is emitted, so
//! a typo in one action field never aborts `Dialog::process`.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([a-zA-Z0-9_.]+)\s*\}\}").expect("static regex"))
}

/// Renders every string leaf of `payload` against `context`, using
/// `fallback` for placeholders that don't resolve.
pub fn render(payload: &Value, context: &Value, fallback: &str) -> Value {
    match payload {
        Value::String(s) => Value::String(render_str(s, context, fallback)),
        Value::Array(items) => Value::Array(items.iter().map(|v| render(v, context, fallback)).collect()),
        Value::Object(map) => {
            let rendered = map.iter().map(|(k, v)| (k.clone(), render(v, context, fallback))).collect();
            Value::Object(rendered)
        }
        other => other.clone(),
    }
}

pub fn render_str(template: &str, context: &Value, fallback: &str) -> String {
    placeholder_re()
        .replace_all(template, |caps: &regex::Captures| {
            let path = &caps[1];
            match lookup(context, path) {
                Some(value) => value_to_text(&value),
                None => {
                    tracing::warn!(path, "template placeholder did not resolve, using fallback");
                    fallback.to_string()
                }
            }
        })
        .into_owned()
}

/// Resolves a dotted path (`a.b.c`) against a JSON object/array context.
pub fn lookup(context: &Value, path: &str) -> Option<Value> {
    let mut current = context;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current.clone())
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Merges two JSON objects, with `overlay` winning on key collisions. Used
/// to build the `(dialog metadata ∪ extras)` render context per spec §4.2.
pub fn merge_objects(base: &Value, overlay: &Value) -> Value {
    let mut merged = base.as_object().cloned().unwrap_or_default();
    if let Some(overlay) = overlay.as_object() {
        for (k, v) in overlay {
            merged.insert(k.clone(), v.clone());
        }
    }
    Value::Object(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn substitutes_simple_key() {
        let ctx = json!({"name": "Ada"});
        assert_eq!(render_str("hi {{ name }}", &ctx, "?"), "hi Ada");
    }

    #[test]
    fn substitutes_dotted_path() {
        let ctx = json!({"user": {"name": "Grace"}});
        assert_eq!(render_str("hi {{ user.name }}", &ctx, "?"), "hi Grace");
    }

    #[test]
    fn unresolved_uses_fallback_not_panic() {
        let ctx = json!({});
        assert_eq!(render_str("hi {{ missing }}", &ctx, "??"), "hi ??");
    }

    #[test]
    fn walks_lists_and_maps() {
        let ctx = json!({"x": "1"});
        let payload = json!({"items": ["{{ x }}", {"nested": "{{ x }}"}]});
        let rendered = render(&payload, &ctx, "?");
        assert_eq!(rendered, json!({"items": ["1", {"nested": "1"}]}));
    }

    #[test]
    fn merge_overlay_wins() {
        let base = json!({"a": 1, "b": 2});
        let overlay = json!({"b": 3, "c": 4});
        assert_eq!(merge_objects(&base, &overlay), json!({"a": 1, "b": 3, "c": 4}));
    }
}
