use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::{json, Map, Value};

use crate::action::ActionResult;

/// Callback bound to an element event. The argument is the value captured by
/// the event (current text of an input, new switch state), if any.
pub type EventHandler =
    Arc<dyn Fn(Option<Value>) -> BoxFuture<'static, ActionResult<()>> + Send + Sync>;

/// Rendered output: a primitive with resolved props, style, children and
/// bound handlers. Hosts map these onto their widget toolkit.
#[derive(Clone)]
pub struct Element {
    pub kind: String,
    pub key: Option<String>,
    pub props: Map<String, Value>,
    pub style: Map<String, Value>,
    pub children: Vec<Element>,
    pub handlers: BTreeMap<String, EventHandler>,
    pub enabled: bool,
}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Element")
            .field("kind", &self.kind)
            .field("key", &self.key)
            .field("props", &self.props)
            .field("style", &self.style)
            .field("children", &self.children)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl Element {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            key: None,
            props: Map::new(),
            style: Map::new(),
            children: Vec::new(),
            handlers: BTreeMap::new(),
            enabled: true,
        }
    }

    pub fn with_prop(mut self, key: &str, value: Value) -> Self {
        self.props.insert(key.to_string(), value);
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_handler(mut self, event: &str, handler: EventHandler) -> Self {
        self.handlers.insert(event.to_string(), handler);
        self
    }

    /// Text content, from `text` or a string `children` prop.
    pub fn text(&self) -> Option<&str> {
        self.props
            .get("text")
            .or_else(|| self.props.get("children"))
            .and_then(Value::as_str)
    }

    pub fn find_by_key(&self, key: &str) -> Option<&Element> {
        if self.key.as_deref() == Some(key) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find_by_key(key))
    }

    pub fn find_all_by_kind<'a>(&'a self, kind: &str, found: &mut Vec<&'a Element>) {
        if self.kind == kind {
            found.push(self);
        }
        for child in &self.children {
            child.find_all_by_kind(kind, found);
        }
    }

    pub fn has_handler(&self, event: &str) -> bool {
        self.handlers.contains_key(event)
    }

    /// Fires `event`. Resolves to `false` when nothing is bound to it.
    pub async fn trigger(&self, event: &str, value: Option<Value>) -> ActionResult<bool> {
        match self.handlers.get(event) {
            Some(handler) => {
                handler(value).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "type": self.kind,
            "key": self.key,
            "props": self.props,
            "style": self.style,
            "enabled": self.enabled,
            "events": self.handlers.keys().collect::<Vec<_>>(),
            "children": self.children.iter().map(Element::to_json).collect::<Vec<_>>(),
        })
    }

    /// Indented one-line-per-element summary.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.write_outline(&mut out, 0);
        out
    }

    fn write_outline(&self, out: &mut String, indent: usize) {
        let _ = write!(out, "{:width$}{}", "", self.kind, width = indent * 2);
        if let Some(key) = &self.key {
            let _ = write!(out, "#{}", key);
        }
        if let Some(text) = self.text() {
            let _ = write!(out, " {:?}", text);
        }
        if !self.handlers.is_empty() {
            let events: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
            let _ = write!(out, " [{}]", events.join(", "));
        }
        if !self.enabled {
            out.push_str(" (disabled)");
        }
        out.push('\n');
        for child in &self.children {
            child.write_outline(out, indent + 1);
        }
    }
}
