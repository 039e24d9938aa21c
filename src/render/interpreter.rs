use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::element::{Element, EventHandler};
use super::input::InputSemantic;
use super::node::ComponentNode;
use super::registry::{PrimitiveInput, PrimitiveRegistry};
use super::RenderResult;
use crate::action::{ActionDescriptor, ActionResult, ExecutionMetrics};
use crate::config::RendererConfig;
use crate::eval::{evaluate, interpolate, layer};

/// Where bound event handlers send their actions.
pub trait ActionSink: Send + Sync {
    /// `input` is the value a user entered, if the event captured one. It must
    /// reach the verb as entered, never interpolated.
    fn dispatch(
        &self,
        action: ActionDescriptor,
        overlay: Option<Value>,
        input: Option<Value>,
    ) -> BoxFuture<'static, ActionResult<()>>;
}

/// Per-render inputs: the context snapshot and the action sink.
#[derive(Clone)]
pub struct RenderScope {
    pub context: Arc<Value>,
    pub sink: Arc<dyn ActionSink>,
    fingerprint: u64,
}

impl RenderScope {
    /// Scope over an arbitrary context, fingerprinted by content.
    pub fn new(context: Value, sink: Arc<dyn ActionSink>) -> Self {
        let mut hasher = DefaultHasher::new();
        context.to_string().hash(&mut hasher);
        sink_id(&sink).hash(&mut hasher);
        Self {
            context: Arc::new(context),
            sink,
            fingerprint: hasher.finish(),
        }
    }

    /// Scope over a context snapshot taken at `revision`, fingerprinted by the
    /// revision and overlay instead of the whole context.
    pub fn versioned(
        revision: u64,
        base: Arc<Value>,
        overlay: Option<&Value>,
        sink: Arc<dyn ActionSink>,
    ) -> Self {
        let mut hasher = DefaultHasher::new();
        revision.hash(&mut hasher);
        overlay.map(Value::to_string).hash(&mut hasher);
        sink_id(&sink).hash(&mut hasher);
        Self {
            context: layer(base, overlay),
            sink,
            fingerprint: hasher.finish(),
        }
    }
}

fn sink_id(sink: &Arc<dyn ActionSink>) -> usize {
    Arc::as_ptr(sink) as *const () as usize
}

/// Memoized output for one tree position.
struct CacheEntry {
    fingerprint: u64,
    node: ComponentNode,
    element: Option<Element>,
}

const VALUE_EVENTS: [&str; 2] = ["onChangeText", "onValueChange"];

/// Walks component trees and builds [`Element`]s through the primitive registry.
///
/// Results are memoized per tree position (`"0"`, `"0.2"`, ...). An entry is
/// reused only when the scope fingerprint matches and the node at that position
/// is unchanged, so unchanged subtrees are not re-evaluated on repaint.
pub struct TreeInterpreter {
    registry: Arc<PrimitiveRegistry>,
    config: RendererConfig,
    cache: Mutex<HashMap<String, CacheEntry>>,
    metrics: Arc<ExecutionMetrics>,
}

impl TreeInterpreter {
    pub fn new(
        registry: Arc<PrimitiveRegistry>,
        config: RendererConfig,
        metrics: Arc<ExecutionMetrics>,
    ) -> Self {
        Self {
            registry,
            config,
            cache: Mutex::new(HashMap::new()),
            metrics,
        }
    }

    pub fn registry(&self) -> &Arc<PrimitiveRegistry> {
        &self.registry
    }

    pub fn render(&self, tree: &[ComponentNode], scope: &RenderScope) -> RenderResult<Vec<Element>> {
        let mut out = Vec::with_capacity(tree.len());
        for (index, node) in tree.iter().enumerate() {
            if let Some(element) = self.render_at(node, scope, 1, index.to_string())? {
                out.push(element);
            }
        }
        Ok(out)
    }

    /// Renders a single root node. `Ok(None)` means the node is intentionally
    /// absent: hidden, too deep, or of an unknown type.
    pub fn render_node(
        &self,
        node: &ComponentNode,
        scope: &RenderScope,
    ) -> RenderResult<Option<Element>> {
        self.render_at(node, scope, 1, "0".to_string())
    }

    /// `depth` counts from 1 at the roots; `path` is the node's tree position.
    fn render_at(
        &self,
        node: &ComponentNode,
        scope: &RenderScope,
        depth: usize,
        path: String,
    ) -> RenderResult<Option<Element>> {
        if depth > self.config.max_depth {
            warn!(
                "Component '{}' exceeds max depth {}, not rendered",
                node.kind, self.config.max_depth
            );
            return Ok(None);
        }

        if let Some(entry) = self.cache().get(&path) {
            if entry.fingerprint == scope.fingerprint && entry.node == *node {
                self.metrics.record_cache_hit();
                return Ok(entry.element.clone());
            }
        }

        let rendered = self.build(node, scope, depth, &path)?;
        let mut cache = self.cache();
        if cache.len() >= self.config.memo_capacity && !cache.contains_key(&path) {
            debug!("Render cache full ({} entries), flushing", cache.len());
            cache.clear();
        }
        cache.insert(
            path,
            CacheEntry {
                fingerprint: scope.fingerprint,
                node: node.clone(),
                element: rendered.clone(),
            },
        );
        Ok(rendered)
    }

    fn build(
        &self,
        node: &ComponentNode,
        scope: &RenderScope,
        depth: usize,
        path: &str,
    ) -> RenderResult<Option<Element>> {
        let conditions = &node.conditions;
        if conditions
            .hide
            .as_ref()
            .is_some_and(|hide| evaluate(hide, &scope.context))
        {
            return Ok(None);
        }
        if conditions
            .show
            .as_ref()
            .is_some_and(|show| !evaluate(show, &scope.context))
        {
            return Ok(None);
        }

        let Some(factory) = self.registry.get(&node.kind) else {
            warn!("Unknown component type '{}', skipping", node.kind);
            return Ok(None);
        };

        let mut props = match interpolate(&Value::Object(node.props.clone()), &scope.context) {
            Value::Object(props) => props,
            _ => Map::new(),
        };

        let disabled = conditions
            .disable
            .as_ref()
            .is_some_and(|disable| evaluate(disable, &scope.context))
            || conditions
                .enable
                .as_ref()
                .is_some_and(|enable| !evaluate(enable, &scope.context));

        let handlers = if disabled {
            props.insert("disabled".to_string(), Value::Bool(true));
            BTreeMap::new()
        } else {
            bind_handlers(node, &props, scope)
        };

        let mut children = Vec::with_capacity(node.children.len());
        for (index, child) in node.children.iter().enumerate() {
            let child_path = format!("{}.{}", path, index);
            if let Some(element) = self.render_at(child, scope, depth + 1, child_path)? {
                children.push(element);
            }
        }

        factory
            .build(PrimitiveInput {
                kind: node.kind.clone(),
                key: node.id.clone(),
                props,
                style: node.style.clone(),
                children,
                handlers,
                enabled: !disabled,
            })
            .map(Some)
    }

    pub fn clear_cache(&self) {
        self.cache().clear();
    }

    pub fn cache_len(&self) -> usize {
        self.cache().len()
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn bind_handlers(
    node: &ComponentNode,
    props: &Map<String, Value>,
    scope: &RenderScope,
) -> BTreeMap<String, EventHandler> {
    let semantic = if node.kind == "TextInput" {
        InputSemantic::infer(node.id.as_deref(), props)
    } else {
        None
    };

    let mut handlers = BTreeMap::new();
    for (event, action) in &node.actions {
        let mut action = action.clone();
        if action.component_id.is_none() {
            action.component_id = node.id.clone();
        }
        let mirror = semantic.filter(|_| event == "onChangeText");
        let handler = make_handler(
            Some(action),
            VALUE_EVENTS.contains(&event.as_str()),
            mirror,
            node.id.clone(),
            scope.sink.clone(),
        );
        handlers.insert(event.clone(), handler);
    }

    if let Some(semantic) = semantic {
        handlers.entry("onChangeText".to_string()).or_insert_with(|| {
            make_handler(None, true, Some(semantic), node.id.clone(), scope.sink.clone())
        });
    }
    handlers
}

fn make_handler(
    declared: Option<ActionDescriptor>,
    captures_value: bool,
    mirror: Option<InputSemantic>,
    component_id: Option<String>,
    sink: Arc<dyn ActionSink>,
) -> EventHandler {
    Arc::new(move |value: Option<Value>| {
        let sink = sink.clone();
        let mirror = mirror
            .filter(|_| value.is_some())
            .map(|semantic| semantic.state_update(component_id.as_deref()));
        let action = declared.clone();
        let mirrored = value.clone();
        let input = value.filter(|_| captures_value);

        async move {
            if let Some(update) = mirror {
                if let Err(e) = sink.dispatch(update, None, mirrored).await {
                    warn!("Input state mirroring failed: {}", e);
                }
            }
            match action {
                Some(action) => sink.dispatch(action, None, input).await,
                None => Ok(()),
            }
        }
        .boxed()
    })
}
