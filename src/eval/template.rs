use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_json::Value;

use super::path;

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\{\{\s*([^{}]+?)\s*\}\}").unwrap();
    static ref WHOLE_PLACEHOLDER: Regex = Regex::new(r"^\{\{\s*([^{}]+?)\s*\}\}$").unwrap();
}

/// Resolves `{{path}}` placeholders in `value` against `context`.
///
/// A string that is exactly one placeholder resolves to the referenced value
/// with its JSON type intact, or stays untouched if the path is missing.
/// Placeholders embedded in longer strings are replaced by their string form
/// (empty when missing). Arrays and objects are rebuilt recursively.
///
/// Substitution is a single pass: resolved values are inserted as-is, even when
/// they contain `{{...}}` themselves. The output must not be interpolated again,
/// or context text would be expanded as template.
pub fn interpolate(value: &Value, context: &Value) -> Value {
    match value {
        Value::String(s) => interpolate_string(s, context),
        Value::Array(items) => Value::Array(items.iter().map(|v| interpolate(v, context)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), interpolate(v, context)))
                .collect(),
        ),
        other => other.clone(),
    }
}

pub fn interpolate_string(template: &str, context: &Value) -> Value {
    if !template.contains("{{") {
        return Value::String(template.to_string());
    }
    if let Some(caps) = WHOLE_PLACEHOLDER.captures(template) {
        return match path::resolve(context, &caps[1]) {
            Some(resolved) => resolved.clone(),
            None => Value::String(template.to_string()),
        };
    }
    Value::String(interpolate_str(template, context))
}

/// Inline substitution only; always yields a string.
pub fn interpolate_str(template: &str, context: &Value) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            path::resolve(context, &caps[1])
                .map(display)
                .unwrap_or_default()
        })
        .into_owned()
}

pub fn has_placeholder(value: &Value) -> bool {
    match value {
        Value::String(s) => PLACEHOLDER.is_match(s),
        Value::Array(items) => items.iter().any(has_placeholder),
        Value::Object(map) => map.values().any(has_placeholder),
        _ => false,
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
