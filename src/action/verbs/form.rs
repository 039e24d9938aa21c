use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::{VerbContext, VerbError, VerbHandler, VerbResult};
use crate::eval::{evaluate, ConditionExpr};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldSpec {
    name: String,
    #[serde(default)]
    value: Option<Value>,
    /// Context path read when `value` is absent.
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    rules: Rules,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Rules {
    #[serde(default)]
    required: bool,
    min_length: Option<usize>,
    max_length: Option<usize>,
    pattern: Option<String>,
    /// Evaluated with the field's value available as `value`.
    custom: Option<ConditionExpr>,
}

/// `validateForm`: `{fields: [{name, value | path, label?, rules, message?}]}`.
///
/// All fields are checked; the verb fails once with every violation joined by
/// `"; "`.
pub struct ValidateForm;

fn as_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl FieldSpec {
    fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    fn resolve(&self, ctx: &VerbContext) -> Value {
        match (&self.value, &self.path) {
            (Some(value), _) => value.clone(),
            (None, Some(path)) => ctx.context.get(path).unwrap_or(Value::Null),
            (None, None) => ctx.context.get(&self.name).unwrap_or(Value::Null),
        }
    }

    fn violation(&self, ctx: &VerbContext) -> VerbResult<Option<String>> {
        let value = self.resolve(ctx);
        let text = as_text(&value);
        let label = self.label();
        let rules = &self.rules;

        let failure = if text.trim().is_empty() {
            rules.required.then(|| format!("{} is required", label))
        } else if rules.min_length.is_some_and(|min| text.chars().count() < min) {
            rules
                .min_length
                .map(|min| format!("{} must be at least {} characters", label, min))
        } else if rules.max_length.is_some_and(|max| text.chars().count() > max) {
            rules
                .max_length
                .map(|max| format!("{} must be at most {} characters", label, max))
        } else if let Some(pattern) = &rules.pattern {
            let re = Regex::new(pattern).map_err(|e| VerbError::InvalidField {
                field: "pattern",
                message: e.to_string(),
            })?;
            (!re.is_match(&text)).then(|| format!("{} is invalid", label))
        } else {
            None
        };

        let failure = failure.or_else(|| {
            let custom = rules.custom.as_ref()?;
            let scope = ctx.context.snapshot_with(Some(&json!({ "value": value })));
            (!evaluate(custom, &scope)).then(|| format!("{} is invalid", label))
        });

        Ok(failure.map(|default| self.message.clone().unwrap_or(default)))
    }
}

#[async_trait]
impl VerbHandler for ValidateForm {
    async fn execute(&self, payload: &Map<String, Value>, ctx: &VerbContext) -> VerbResult<()> {
        let fields: Vec<FieldSpec> = match payload.get("fields") {
            Some(fields) => {
                serde_json::from_value(fields.clone()).map_err(|e| VerbError::InvalidField {
                    field: "fields",
                    message: e.to_string(),
                })?
            }
            None => return Err(VerbError::MissingField("fields")),
        };

        let mut violations = Vec::new();
        for field in &fields {
            if let Some(message) = field.violation(ctx)? {
                violations.push(message);
            }
        }
        if violations.is_empty() {
            debug!("Form with {} fields is valid", fields.len());
            Ok(())
        } else {
            Err(VerbError::Validation(violations.join("; ")))
        }
    }
}
