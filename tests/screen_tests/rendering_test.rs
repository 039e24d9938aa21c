use std::sync::Arc;

use pretty_assertions::assert_eq;
use sdui::{
    config::SduiConfig,
    render::{PrimitiveInput, PrimitiveRegistry, RenderResult, PLACEHOLDER},
    DynamicRenderer, Element, ExecutionContext, HostServices, RenderError,
};
use serde_json::{json, Value};

use super::nodes;

/// A chain of `depth` nodes: Views down to a Text leaf, each keyed `level-N`.
fn nested(depth: usize) -> Value {
    let mut node = json!({
        "type": "Text",
        "id": format!("level-{}", depth),
        "props": {"text": "leaf"}
    });
    for level in (1..depth).rev() {
        node = json!({"type": "View", "id": format!("level-{}", level), "children": [node]});
    }
    node
}

#[test]
fn test_greeting_outline() {
    let renderer = DynamicRenderer::new(
        ExecutionContext::from_value(json!({"user": {"name": "Sam"}})),
        HostServices::new(),
    );
    let output = renderer.render(&nodes(json!({
        "type": "View",
        "children": [
            {"type": "Text", "props": {"text": "Hi {{user.name}}"}},
            {"type": "Button", "id": "go", "props": {"title": "Go"},
             "actions": {"onPress": {"type": "navigate", "payload": {"navigateTo": "Home"}}}}
        ]
    })));

    assert!(!output.is_fallback());
    assert_eq!(
        output.elements()[0].outline(),
        "View\n  Text \"Hi Sam\"\n  Button#go [onPress]\n"
    );
}

#[test]
fn test_depth_limit_drops_deep_nodes() {
    let renderer = DynamicRenderer::new(ExecutionContext::new(), HostServices::new());
    let output = renderer.render(&nodes(nested(12)));

    let root = &output.elements()[0];
    let deepest = root.find_by_key("level-10").expect("level 10 is within the limit");
    assert!(deepest.children.is_empty());
    assert!(root.find_by_key("level-11").is_none());
    assert!(root.find_by_key("level-12").is_none());
}

#[test]
fn test_configured_depth_limit() {
    let mut config = SduiConfig::default();
    config.renderer.max_depth = 3;
    let renderer = DynamicRenderer::builder().config(config).build();

    let output = renderer.render(&nodes(nested(5)));
    let root = &output.elements()[0];
    assert!(root.find_by_key("level-3").is_some());
    assert!(root.find_by_key("level-4").is_none());
}

#[test]
fn test_unknown_types_are_omitted() {
    let renderer = DynamicRenderer::new(ExecutionContext::new(), HostServices::new());
    let output = renderer.render(&nodes(json!([
        {"type": "Text", "props": {"text": "A"}},
        {"type": "Bogus"},
        {"type": "View", "children": [
            {"type": "Bogus", "props": {"anything": true}},
            {"type": "Text", "props": {"text": "B"}}
        ]}
    ])));

    assert!(!output.is_fallback());
    let elements = output.elements();
    assert_eq!(elements.len(), 2);
    assert_eq!(elements[1].children.len(), 1);
    assert_eq!(elements[1].children[0].text(), Some("B"));
}

#[test]
fn test_admin_panel_follows_context() {
    let renderer = DynamicRenderer::new(
        ExecutionContext::from_value(json!({"user": {"isAdmin": false}})),
        HostServices::new(),
    );
    let tree = nodes(json!({
        "type": "View",
        "id": "admin-panel",
        "conditions": {"show": {"operator": "equals", "field": "user.isAdmin", "value": true}}
    }));

    assert!(renderer.render(&tree).elements().is_empty());

    renderer.update_context(json!({"user": {"isAdmin": true}}));
    let output = renderer.render(&tree);
    assert_eq!(output.elements()[0].key.as_deref(), Some("admin-panel"));
}

#[tokio::test]
async fn test_disabled_button_has_no_handlers() {
    let renderer = DynamicRenderer::new(
        ExecutionContext::from_value(json!({"form": {"phone": ""}})),
        HostServices::new(),
    );
    let tree = nodes(json!({
        "type": "Button",
        "id": "send",
        "props": {"title": "Send code"},
        "actions": {"onPress": {"type": "log", "payload": {"message": "pressed"}}},
        "conditions": {"disable": {"operator": "empty", "field": "form.phone"}}
    }));

    let output = renderer.render(&tree);
    let button = &output.elements()[0];
    assert!(!button.enabled);
    assert_eq!(button.props["disabled"], json!(true));
    assert!(!button.trigger("onPress", None).await.unwrap());

    renderer.update_context(json!({"form": {"phone": "5551234"}}));
    let output = renderer.render(&tree);
    assert!(output.elements()[0].trigger("onPress", None).await.unwrap());
    assert_eq!(renderer.metrics().actions_succeeded, 1);
}

#[test]
fn test_repeat_render_hits_cache() {
    let renderer = DynamicRenderer::new(
        ExecutionContext::from_value(json!({"count": 1})),
        HostServices::new(),
    );
    let tree = nodes(json!({"type": "Text", "props": {"text": "{{count}}"}}));

    renderer.render(&tree);
    assert_eq!(renderer.metrics().cache_hits, 0);
    renderer.render(&tree);
    assert_eq!(renderer.metrics().cache_hits, 1);

    renderer.update_context(json!({"count": 2}));
    let output = renderer.render(&tree);
    assert_eq!(output.elements()[0].text(), Some("2"));
    assert_eq!(renderer.metrics().cache_hits, 1);

    renderer.clear_cache();
    renderer.render(&tree);
    assert_eq!(renderer.metrics().cache_hits, 1);
}

#[test]
fn test_context_values_are_not_expanded_twice() {
    let renderer = DynamicRenderer::new(
        ExecutionContext::from_value(json!({
            "user": {"bio": "I like {{user.secret}}", "secret": "hunter2"}
        })),
        HostServices::new(),
    );
    let output = renderer.render(&nodes(json!([
        {"type": "Text", "props": {"text": "{{user.bio}}"}},
        {"type": "Text", "props": {"text": "Bio: {{user.bio}}"}}
    ])));

    assert_eq!(output.elements()[0].text(), Some("I like {{user.secret}}"));
    assert_eq!(output.elements()[1].text(), Some("Bio: I like {{user.secret}}"));
}

#[test]
fn test_custom_primitive() {
    let registry = Arc::new(PrimitiveRegistry::with_builtins());
    registry.register(
        "Badge",
        Arc::new(|input: PrimitiveInput| -> RenderResult<Element> {
            let count = input.props.get("count").cloned().unwrap_or(json!(0));
            Ok(input
                .into_element()
                .with_prop("text", json!(format!("({})", count))))
        }),
    );
    let renderer = DynamicRenderer::builder()
        .primitives(registry)
        .context(ExecutionContext::from_value(json!({"inbox": {"unread": 3}})))
        .build();

    let output = renderer.render(&nodes(json!({
        "type": "Badge",
        "props": {"count": "{{inbox.unread}}"}
    })));
    assert_eq!(output.elements()[0].text(), Some("(3)"));
}

#[test]
fn test_missing_media_keeps_screen_up() {
    let renderer = DynamicRenderer::new(
        ExecutionContext::from_value(json!({"user": {"name": "Sam", "avatar": null}})),
        HostServices::new(),
    );
    let output = renderer.render(&nodes(json!({
        "type": "View",
        "children": [
            {"type": "Image", "id": "avatar", "props": {"source": "{{user.avatar}}"}},
            {"type": "Icon", "id": "badge"},
            {"type": "Text", "props": {"text": "Hi {{user.name}}"}}
        ]
    })));

    assert!(!output.is_fallback());
    let root = &output.elements()[0];
    let avatar = root.find_by_key("avatar").unwrap();
    assert_eq!(avatar.kind, PLACEHOLDER);
    assert_eq!(avatar.props["placeholderFor"], json!("Image"));
    assert_eq!(root.find_by_key("badge").unwrap().kind, PLACEHOLDER);
    assert_eq!(root.children[2].text(), Some("Hi Sam"));
}

#[test]
fn test_broken_primitive_trips_boundary_until_retry() {
    let registry = Arc::new(PrimitiveRegistry::with_builtins());
    registry.register(
        "Chart",
        Arc::new(|input: PrimitiveInput| -> RenderResult<Element> {
            Err(RenderError::Primitive {
                kind: input.kind,
                message: "series missing".to_string(),
            })
        }),
    );
    let renderer = DynamicRenderer::builder().primitives(registry).build();
    let broken = nodes(json!({"type": "Chart", "id": "hero"}));
    let fine = nodes(json!({"type": "Text", "props": {"text": "ok"}}));

    let output = renderer.render(&broken);
    assert!(output.is_fallback());

    // stays on the fallback even for a healthy tree
    assert!(renderer.render(&fine).is_fallback());

    renderer.boundary().reset();
    let output = renderer.render(&fine);
    assert!(!output.is_fallback());
    assert_eq!(output.elements()[0].text(), Some("ok"));
}
