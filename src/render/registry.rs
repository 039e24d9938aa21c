use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use super::element::{Element, EventHandler};
use super::RenderResult;

/// Everything the interpreter resolved for a node, handed to its primitive.
#[derive(Clone, Default)]
pub struct PrimitiveInput {
    pub kind: String,
    pub key: Option<String>,
    pub props: Map<String, Value>,
    pub style: Map<String, Value>,
    pub children: Vec<Element>,
    pub handlers: BTreeMap<String, EventHandler>,
    pub enabled: bool,
}

impl PrimitiveInput {
    pub fn into_element(self) -> Element {
        Element {
            kind: self.kind,
            key: self.key,
            props: self.props,
            style: self.style,
            children: self.children,
            handlers: self.handlers,
            enabled: self.enabled,
        }
    }

    /// Stand-in for a primitive whose required data is missing, so one bad
    /// node doesn't take the whole screen down.
    fn placeholder(mut self, reason: &str) -> Element {
        warn!(
            "{} '{}' rendered as placeholder: {}",
            self.kind,
            self.key.as_deref().unwrap_or_default(),
            reason
        );
        self.props.insert(
            "placeholderFor".to_string(),
            Value::String(std::mem::replace(&mut self.kind, PLACEHOLDER.to_string())),
        );
        self.props
            .insert("reason".to_string(), Value::String(reason.to_string()));
        self.into_element()
    }
}

pub const PLACEHOLDER: &str = "Placeholder";

pub trait PrimitiveFactory: Send + Sync {
    fn build(&self, input: PrimitiveInput) -> RenderResult<Element>;
}

impl<F> PrimitiveFactory for F
where
    F: Fn(PrimitiveInput) -> RenderResult<Element> + Send + Sync,
{
    fn build(&self, input: PrimitiveInput) -> RenderResult<Element> {
        self(input)
    }
}

/// Type name to primitive. Unknown names are the interpreter's concern.
#[derive(Default)]
pub struct PrimitiveRegistry {
    primitives: DashMap<String, Arc<dyn PrimitiveFactory>>,
}

impl PrimitiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let registry = Self::new();
        for kind in [
            "Container",
            "View",
            "ScrollView",
            "SafeAreaView",
            "KeyboardAvoidingView",
            "TextInput",
            "ActivityIndicator",
            "Button",
            "TouchableOpacity",
        ] {
            registry.register(kind, Arc::new(passthrough));
        }
        registry.register("Text", Arc::new(text));
        registry.register("Image", Arc::new(image));
        registry.register("Switch", Arc::new(switch));
        registry.register("Icon", Arc::new(icon));
        registry
    }

    pub fn register(&self, kind: &str, factory: Arc<dyn PrimitiveFactory>) {
        if self.primitives.insert(kind.to_string(), factory).is_some() {
            debug!("Primitive '{}' replaced", kind);
        }
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn PrimitiveFactory>> {
        self.primitives.get(kind).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.primitives.contains_key(kind)
    }
}

fn passthrough(input: PrimitiveInput) -> RenderResult<Element> {
    Ok(input.into_element())
}

/// Normalizes `text`, `content` or `children` props into a string `text` prop.
fn text(mut input: PrimitiveInput) -> RenderResult<Element> {
    let content = ["text", "content", "children"]
        .iter()
        .find_map(|key| input.props.remove(*key))
        .unwrap_or(Value::Null);
    let content = match content {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    };
    input.props.insert("text".to_string(), Value::String(content));
    Ok(input.into_element())
}

/// Takes `source` or `uri`; a bare string source becomes `{uri}`. Without
/// either the node renders as a placeholder.
fn image(mut input: PrimitiveInput) -> RenderResult<Element> {
    let source = input
        .props
        .remove("source")
        .or_else(|| input.props.remove("uri"));
    let source = match source {
        Some(Value::String(uri)) if !uri.is_empty() => json!({ "uri": uri }),
        Some(Value::Object(source)) if source.contains_key("uri") => Value::Object(source),
        _ => return Ok(input.placeholder("missing image source")),
    };
    input.props.insert("source".to_string(), source);
    Ok(input.into_element())
}

fn switch(mut input: PrimitiveInput) -> RenderResult<Element> {
    let on = input.props.get("value").is_some_and(|v| v.as_bool() == Some(true));
    input.props.insert("value".to_string(), Value::Bool(on));
    Ok(input.into_element())
}

fn icon(input: PrimitiveInput) -> RenderResult<Element> {
    let named = matches!(input.props.get("name"), Some(Value::String(name)) if !name.is_empty());
    if !named {
        return Ok(input.placeholder("missing icon name"));
    }
    Ok(input.into_element())
}
