//! The restricted expression grammar backing the `custom` node.
//!
//! Spec §4.3 and §9 explicitly permit replacing the source's arbitrary
//! script sandbox with "a small, explicit expression grammar" and say so
//! "does not change the rest of the spec". `SPEC_FULL.md` records this as
//! the chosen strategy. The grammar reuses `If`'s comparison vocabulary
//! (`<`, `>`, `==`, `contains`) plus boolean combinators, evaluated against
//! a JSON object built from `(variables ∪ extras)` — no code execution, no
//! sandboxing seam to get wrong.

use crate::error::{EngineError, Result};
use crate::template::lookup;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompareOp {
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "==")]
    Eq,
    Contains,
}

/// A boolean expression tree over the render context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum Expr {
    Compare { key: String, condition: CompareOp, value: Value },
    All { all: Vec<Expr> },
    Any { any: Vec<Expr> },
    Not { not: Box<Expr> },
    Literal { literal: bool },
}

impl Expr {
    /// Evaluates against `context` (typically `variables ∪ extras`).
    /// Mirrors `If`'s per-condition semantics: missing keys for a
    /// `Compare` are an [`EngineError::Custom`] (the custom-node analogue
    /// of spec §4.3's `If`-node `DialogError` on a missing value), not a
    /// silent `false` — a typo in the script should surface, not branch
    /// the wrong way quietly.
    pub fn eval(&self, context: &Value) -> Result<bool> {
        match self {
            Expr::Literal { literal } => Ok(*literal),
            Expr::Not { not } => Ok(!not.eval(context)?),
            Expr::All { all } => {
                for e in all {
                    if !e.eval(context)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Expr::Any { any } => {
                for e in any {
                    if e.eval(context)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Expr::Compare { key, condition, value } => {
                let actual = lookup(context, key)
                    .ok_or_else(|| EngineError::Custom(format!("custom expression: missing key '{key}'")))?;
                Ok(compare(&actual, *condition, value))
            }
        }
    }
}

fn compare(actual: &Value, op: CompareOp, expected: &Value) -> bool {
    match op {
        CompareOp::Eq => actual == expected,
        CompareOp::Lt => match (as_f64(actual), as_f64(expected)) {
            (Some(a), Some(b)) => a < b,
            _ => false,
        },
        CompareOp::Gt => match (as_f64(actual), as_f64(expected)) {
            (Some(a), Some(b)) => a > b,
            _ => false,
        },
        CompareOp::Contains => expected
            .as_array()
            .map(|candidates| {
                candidates.iter().any(|c| match (actual.as_str(), c.as_str()) {
                    (Some(a), Some(c)) => a.contains(c),
                    _ => actual == c,
                })
            })
            .unwrap_or(false),
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    v.as_f64().or_else(|| v.as_str().and_then(|s| s.parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn compares_numeric_lt() {
        let e = Expr::Compare { key: "age".into(), condition: CompareOp::Lt, value: json!(30) };
        assert!(e.eval(&json!({"age": 20})).unwrap());
        assert!(!e.eval(&json!({"age": 40})).unwrap());
    }

    #[test]
    fn contains_substring() {
        let e = Expr::Compare {
            key: "name".into(),
            condition: CompareOp::Contains,
            value: json!(["ada", "grace"]),
        };
        assert!(e.eval(&json!({"name": "ada lovelace"})).unwrap());
    }

    #[test]
    fn missing_key_errors() {
        let e = Expr::Compare { key: "nope".into(), condition: CompareOp::Eq, value: json!(1) };
        assert!(e.eval(&json!({})).is_err());
    }

    #[test]
    fn combinators() {
        let e = Expr::All {
            all: vec![
                Expr::Literal { literal: true },
                Expr::Not { not: Box::new(Expr::Literal { literal: false }) },
            ],
        };
        assert!(e.eval(&json!({})).unwrap());
    }
}
