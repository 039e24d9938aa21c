use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::action::ActionDescriptor;
use crate::eval::ConditionExpr;

/// One node of a server-delivered component tree. Never mutated by the
/// interpreter; interpolation produces derived copies.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ComponentNode {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub props: Map<String, Value>,
    #[serde(default)]
    pub style: Map<String, Value>,
    #[serde(default)]
    pub children: Vec<ComponentNode>,
    /// Event name (`onPress`, `onChangeText`, ...) to action.
    #[serde(default)]
    pub actions: BTreeMap<String, ActionDescriptor>,
    #[serde(default)]
    pub conditions: NodeConditions,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeConditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show: Option<ConditionExpr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide: Option<ConditionExpr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable: Option<ConditionExpr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable: Option<ConditionExpr>,
}

impl ComponentNode {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_prop(mut self, key: &str, value: Value) -> Self {
        self.props.insert(key.to_string(), value);
        self
    }

    pub fn with_child(mut self, child: ComponentNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_action(mut self, event: &str, action: ActionDescriptor) -> Self {
        self.actions.insert(event.to_string(), action);
        self
    }

    /// Parses either a single node or an array of nodes.
    pub fn parse_tree(value: Value) -> serde_json::Result<Vec<ComponentNode>> {
        match value {
            Value::Array(_) => serde_json::from_value(value),
            other => serde_json::from_value(other).map(|node| vec![node]),
        }
    }
}
