//! Public entry point: one [`DynamicRenderer`] per rendering session.
//!
//! Combines the tree interpreter, the action engine and the error boundary, and
//! routes handler invocations through the host's optional hooks.
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::action::{
    ActionDescriptor, ActionEngine, ActionEventReceiver, ActionResult, ExecutionMetrics,
    MetricsSnapshot, PerformanceHook, PerformanceMetric, VerbHandler, VerbRegistry,
};
use crate::config::SduiConfig;
use crate::error::Error;
use crate::eval::{ConditionExpr, ExecutionContext};
use crate::host::HostServices;
use crate::render::{
    ActionSink, ComponentNode, ErrorBoundary, PrimitiveRegistry, RenderOutput, RenderScope,
    TreeInterpreter,
};
use crate::screen::{ScreenConfig, ScreenStatus};

/// Host override for action dispatch. Resolves to `true` when it handled the
/// action; `false` (or an error) hands the action to the engine. A captured
/// input value arrives uninterpolated as the payload's `value`.
pub type ActionOverride =
    Arc<dyn Fn(ActionDescriptor, Option<Value>) -> BoxFuture<'static, ActionResult<bool>> + Send + Sync>;

pub type ErrorHook = Arc<dyn Fn(&Error) + Send + Sync>;

struct ActionDispatcher {
    engine: Arc<ActionEngine>,
    on_action: Option<ActionOverride>,
    on_error: Option<ErrorHook>,
}

impl ActionSink for ActionDispatcher {
    fn dispatch(
        &self,
        action: ActionDescriptor,
        overlay: Option<Value>,
        input: Option<Value>,
    ) -> BoxFuture<'static, ActionResult<()>> {
        let engine = self.engine.clone();
        let on_action = self.on_action.clone();
        let on_error = self.on_error.clone();
        async move {
            if let Some(custom) = on_action {
                let mut raw = action.clone();
                if let Some(value) = &input {
                    raw.payload.insert("value".to_string(), value.clone());
                }
                match custom(raw, overlay.clone()).await {
                    Ok(true) => return Ok(()),
                    Ok(false) => {}
                    Err(e) => warn!(
                        "Custom handler for '{}' failed, using engine: {}",
                        action.action_type, e
                    ),
                }
            }
            let result = engine
                .execute_with_input(&action, overlay.as_ref(), input.as_ref())
                .await;
            if let (Err(e), Some(hook)) = (&result, &on_error) {
                hook(&Error::Action(e.clone()));
            }
            result
        }
        .boxed()
    }
}

pub struct DynamicRenderer {
    engine: Arc<ActionEngine>,
    interpreter: TreeInterpreter,
    boundary: ErrorBoundary,
    sink: Arc<dyn ActionSink>,
    on_error: Option<ErrorHook>,
}

#[derive(Default)]
pub struct DynamicRendererBuilder {
    context: Option<ExecutionContext>,
    config: SduiConfig,
    host: HostServices,
    primitives: Option<Arc<PrimitiveRegistry>>,
    verbs: Option<Arc<VerbRegistry>>,
    on_action: Option<ActionOverride>,
    on_error: Option<ErrorHook>,
    on_performance_metric: Option<PerformanceHook>,
}

impl DynamicRendererBuilder {
    pub fn context(mut self, context: ExecutionContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn config(mut self, config: SduiConfig) -> Self {
        self.config = config;
        self
    }

    pub fn host(mut self, host: HostServices) -> Self {
        self.host = host;
        self
    }

    pub fn primitives(mut self, primitives: Arc<PrimitiveRegistry>) -> Self {
        self.primitives = Some(primitives);
        self
    }

    pub fn verbs(mut self, verbs: Arc<VerbRegistry>) -> Self {
        self.verbs = Some(verbs);
        self
    }

    pub fn on_action(mut self, hook: ActionOverride) -> Self {
        self.on_action = Some(hook);
        self
    }

    pub fn on_error(mut self, hook: ErrorHook) -> Self {
        self.on_error = Some(hook);
        self
    }

    pub fn on_performance_metric(
        mut self,
        hook: impl Fn(&PerformanceMetric) + Send + Sync + 'static,
    ) -> Self {
        self.on_performance_metric = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> DynamicRenderer {
        let metrics = Arc::new(ExecutionMetrics::new(
            self.config.engine.metrics_window_cap,
            self.config.engine.metrics_window_keep,
        ));
        let mut engine = ActionEngine::new(
            self.host,
            self.context.unwrap_or_default(),
            self.config.engine,
        )
        .with_metrics(metrics.clone());
        if let Some(verbs) = self.verbs {
            engine = engine.with_registry(verbs);
        }
        if let Some(hook) = self.on_performance_metric {
            engine = engine.with_performance_hook(hook);
        }
        let engine = Arc::new(engine);

        let primitives = self
            .primitives
            .unwrap_or_else(|| Arc::new(PrimitiveRegistry::with_builtins()));
        let interpreter = TreeInterpreter::new(primitives, self.config.renderer, metrics);

        let sink: Arc<dyn ActionSink> = Arc::new(ActionDispatcher {
            engine: engine.clone(),
            on_action: self.on_action,
            on_error: self.on_error.clone(),
        });

        DynamicRenderer {
            engine,
            interpreter,
            boundary: ErrorBoundary::new(),
            sink,
            on_error: self.on_error,
        }
    }
}

impl DynamicRenderer {
    pub fn builder() -> DynamicRendererBuilder {
        DynamicRendererBuilder::default()
    }

    /// Renderer with built-in primitives and verbs over `context`.
    pub fn new(context: ExecutionContext, host: HostServices) -> Self {
        Self::builder().context(context).host(host).build()
    }

    pub fn render(&self, tree: &[ComponentNode]) -> RenderOutput {
        self.render_with(tree, None)
    }

    /// Renders with `overlay`'s top-level keys layered over the shared context.
    pub fn render_with(&self, tree: &[ComponentNode], overlay: Option<&Value>) -> RenderOutput {
        let (revision, base) = self.engine.context().versioned_snapshot();
        let scope = RenderScope::versioned(revision, base, overlay, self.sink.clone());
        self.boundary.render_safely(
            || self.interpreter.render(tree, &scope),
            |e| {
                if let Some(hook) = &self.on_error {
                    hook(&Error::Render(e.clone()));
                }
            },
        )
    }

    pub fn render_screen(&self, screen: &ScreenConfig, status: &ScreenStatus) -> RenderOutput {
        debug!("Rendering screen in state {}", status);
        let tree = screen.tree_for(status);
        let overlay = ScreenConfig::overlay_for(status);
        self.render_with(&tree, overlay.as_ref())
    }

    /// Looks the screen up through the host's screen source. `None` when no
    /// source is wired or it doesn't know the screen.
    pub fn render_named_screen(&self, name: &str) -> Option<RenderOutput> {
        let source = self.engine.host().screens.as_ref()?;
        let screen = source.screen(name)?;
        let status = source.status(name);
        Some(self.render_screen(&screen, &status))
    }

    /// Dispatches through the same path as bound handlers (overrides included).
    pub async fn execute_action(
        &self,
        action: ActionDescriptor,
        overlay: Option<Value>,
    ) -> ActionResult<()> {
        self.sink.dispatch(action, overlay, None).await
    }

    pub fn evaluate_condition(&self, condition: &ConditionExpr) -> bool {
        self.engine.evaluate_condition(condition, None)
    }

    pub fn interpolate_payload(&self, payload: &Map<String, Value>) -> Map<String, Value> {
        self.engine.interpolate_payload(payload, None)
    }

    pub fn update_context(&self, update: Value) {
        self.engine.update_context(update);
    }

    pub fn context(&self) -> &ExecutionContext {
        self.engine.context()
    }

    pub fn register_verb(&self, name: &str, handler: Arc<dyn VerbHandler>) {
        self.engine.register_verb(name, handler);
    }

    pub fn subscribe(&self) -> ActionEventReceiver {
        self.engine.subscribe()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.engine.metrics()
    }

    pub fn reset_metrics(&self) {
        self.engine.reset_metrics();
    }

    /// Drops memoized elements and the engine's throttle/in-flight state.
    pub fn clear_cache(&self) {
        self.interpreter.clear_cache();
        self.engine.clear_cache();
    }

    pub fn engine(&self) -> &Arc<ActionEngine> {
        &self.engine
    }

    pub fn boundary(&self) -> &ErrorBoundary {
        &self.boundary
    }
}
