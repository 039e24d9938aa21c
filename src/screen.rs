use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

use crate::render::ComponentNode;

/// A screen as delivered by the config source.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenConfig {
    #[serde(default)]
    pub components: Vec<ComponentNode>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "node_or_nodes"
    )]
    pub loading_state: Option<Vec<ComponentNode>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "node_or_nodes"
    )]
    pub error_state: Option<Vec<ComponentNode>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, strum::Display)]
pub enum ScreenStatus {
    #[default]
    Loading,
    Ready,
    Failed(String),
}

impl ScreenConfig {
    pub fn new(components: Vec<ComponentNode>) -> Self {
        Self {
            components,
            ..Default::default()
        }
    }

    /// Tree to show for `status`, with built-in trees standing in for missing
    /// loading and error states.
    pub fn tree_for(&self, status: &ScreenStatus) -> Vec<ComponentNode> {
        match status {
            ScreenStatus::Ready => self.components.clone(),
            ScreenStatus::Loading => self
                .loading_state
                .clone()
                .unwrap_or_else(default_loading_tree),
            ScreenStatus::Failed(_) => self
                .error_state
                .clone()
                .unwrap_or_else(default_error_tree),
        }
    }

    /// Extra context for `status`: failures expose `error.message`.
    pub fn overlay_for(status: &ScreenStatus) -> Option<Value> {
        match status {
            ScreenStatus::Failed(message) => Some(json!({ "error": { "message": message } })),
            _ => None,
        }
    }
}

/// Loading and error states may be a single node or a list of nodes.
fn node_or_nodes<'de, D>(deserializer: D) -> Result<Option<Vec<ComponentNode>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => ComponentNode::parse_tree(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

fn default_loading_tree() -> Vec<ComponentNode> {
    vec![ComponentNode::new("ActivityIndicator").with_id("screen-loading")]
}

fn default_error_tree() -> Vec<ComponentNode> {
    vec![ComponentNode::new("Text")
        .with_id("screen-error")
        .with_prop("text", json!("{{error.message}}"))]
}
