mod login_flow_test;
mod rendering_test;

use sdui::ComponentNode;
use serde_json::Value;

pub fn nodes(value: Value) -> Vec<ComponentNode> {
    ComponentNode::parse_tree(value).expect("invalid component tree")
}
