use std::cmp::Ordering;
use std::str::FromStr;

use dashmap::DashMap;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::path;

/// Compiled patterns kept across evaluations; flushed when full.
const REGEX_CACHE_CAP: usize = 256;

lazy_static! {
    static ref REGEX_CACHE: DashMap<String, Regex> = DashMap::new();
}

/// Boolean expression node evaluated against the global data.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConditionExpr {
    pub operator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ConditionExpr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumString, strum::Display)]
#[strum(serialize_all = "camelCase")]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    Contains,
    StartsWith,
    EndsWith,
    Exists,
    Empty,
    Regex,
    In,
    And,
    Or,
    Not,
}

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("Invalid regex '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },
    #[error("Operator '{operator}' expects {expected}")]
    TypeMismatch {
        operator: Operator,
        expected: &'static str,
    },
    #[error("Operator '{0}' needs at least one nested condition")]
    MissingOperand(Operator),
}

pub type EvalResult<T> = Result<T, EvalError>;

impl ConditionExpr {
    pub fn new(operator: Operator) -> Self {
        Self {
            operator: operator.to_string(),
            ..Default::default()
        }
    }

    pub fn compare(operator: Operator, field: &str, value: Value) -> Self {
        Self {
            operator: operator.to_string(),
            field: Some(field.to_string()),
            value: Some(value),
            conditions: vec![],
        }
    }

    pub fn composite(operator: Operator, conditions: Vec<ConditionExpr>) -> Self {
        Self {
            operator: operator.to_string(),
            conditions,
            ..Default::default()
        }
    }
}

/// Evaluates `expr` against `context`. Never fails: unknown operators evaluate
/// to `true`, evaluation errors to `false`.
pub fn evaluate(expr: &ConditionExpr, context: &Value) -> bool {
    match try_evaluate(expr, context) {
        Ok(result) => result,
        Err(e) => {
            warn!("Condition evaluation failed, treating as false: {}", e);
            false
        }
    }
}

pub fn try_evaluate(expr: &ConditionExpr, context: &Value) -> EvalResult<bool> {
    let Ok(operator) = Operator::from_str(&expr.operator) else {
        warn!("Unknown condition operator '{}', treating as true", expr.operator);
        return Ok(true);
    };

    let field = expr
        .field
        .as_deref()
        .and_then(|field| path::resolve(context, field));
    let expected = expr.value.as_ref();

    let result = match operator {
        Operator::Equals => loose_eq(field, expected),
        Operator::NotEquals => !loose_eq(field, expected),
        Operator::GreaterThan => compare(field, expected).is_some_and(Ordering::is_gt),
        Operator::LessThan => compare(field, expected).is_some_and(Ordering::is_lt),
        Operator::GreaterThanOrEqual => compare(field, expected).is_some_and(Ordering::is_ge),
        Operator::LessThanOrEqual => compare(field, expected).is_some_and(Ordering::is_le),
        Operator::Contains => match (field, expected) {
            (Some(Value::String(s)), Some(needle)) => s.contains(&stringify(needle)),
            (Some(Value::Array(items)), needle) => {
                items.iter().any(|item| loose_eq(Some(item), needle))
            }
            _ => false,
        },
        Operator::StartsWith => match (field, expected) {
            (Some(Value::String(s)), Some(prefix)) => s.starts_with(&stringify(prefix)),
            _ => false,
        },
        Operator::EndsWith => match (field, expected) {
            (Some(Value::String(s)), Some(suffix)) => s.ends_with(&stringify(suffix)),
            _ => false,
        },
        Operator::Exists => !is_nullish(field),
        Operator::Empty => is_empty(field),
        Operator::Regex => match (field, expected) {
            (Some(Value::String(s)), Some(Value::String(pattern))) => {
                cached_regex(pattern)?.is_match(s)
            }
            (_, Some(Value::String(_))) => false,
            _ => {
                return Err(EvalError::TypeMismatch {
                    operator,
                    expected: "a string pattern",
                })
            }
        },
        Operator::In => match expected {
            Some(Value::Array(candidates)) => {
                field.is_some() && candidates.iter().any(|c| loose_eq(field, Some(c)))
            }
            _ => {
                return Err(EvalError::TypeMismatch {
                    operator,
                    expected: "an array value",
                })
            }
        },
        // an empty list is false for both
        Operator::And => {
            if expr.conditions.is_empty() {
                false
            } else {
                let mut all = true;
                for nested in &expr.conditions {
                    all &= try_evaluate(nested, context)?;
                }
                all
            }
        }
        Operator::Or => {
            let mut any = false;
            for nested in &expr.conditions {
                any |= try_evaluate(nested, context)?;
            }
            any
        }
        Operator::Not => {
            let first = expr
                .conditions
                .first()
                .ok_or(EvalError::MissingOperand(operator))?;
            !try_evaluate(first, context)?
        }
    };

    debug!(operator = %operator, field = ?expr.field, result, "condition evaluated");
    Ok(result)
}

fn cached_regex(pattern: &str) -> EvalResult<Regex> {
    if let Some(regex) = REGEX_CACHE.get(pattern) {
        return Ok(regex.value().clone());
    }
    let regex = Regex::new(pattern).map_err(|e| EvalError::InvalidRegex {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;
    if REGEX_CACHE.len() >= REGEX_CACHE_CAP {
        debug!("Regex cache full ({} patterns), flushing", REGEX_CACHE.len());
        REGEX_CACHE.clear();
    }
    REGEX_CACHE.insert(pattern.to_string(), regex.clone());
    Ok(regex)
}

fn is_nullish(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(_) => false,
    }
}

/// Strict by type, except that numbers compare by value and an undefined
/// field equals an absent or `null` operand.
pub(crate) fn loose_eq(left: Option<&Value>, right: Option<&Value>) -> bool {
    match (left, right) {
        (l, r) if is_nullish(l) && is_nullish(r) => true,
        (Some(Value::Number(l)), Some(Value::Number(r))) => l.as_f64() == r.as_f64(),
        (Some(l), Some(r)) => l == r,
        _ => false,
    }
}

fn compare(left: Option<&Value>, right: Option<&Value>) -> Option<Ordering> {
    match (left?, right?) {
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        (l, r) => as_number(l)?.partial_cmp(&as_number(r)?),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
