use std::sync::Arc;
use std::time::Duration;

use async_recursion::async_recursion;
use chrono::Utc;
use dashmap::{DashMap, DashSet};
use serde_json::{Map, Value};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::descriptor::ActionDescriptor;
use super::event::{ActionEvent, ActionEventBus, ActionEventReceiver, SkipReason};
use super::metrics::{ExecutionMetrics, MetricsSnapshot, PerformanceMetric};
use super::verbs::{VerbContext, VerbHandler, VerbRegistry};
use super::{ActionError, ActionResult};
use crate::config::EngineConfig;
use crate::eval::{evaluate, interpolate, ConditionExpr, ExecutionContext};
use crate::host::HostServices;

pub type PerformanceHook = Arc<dyn Fn(&PerformanceMetric) + Send + Sync>;

/// Long-lived executor for [`ActionDescriptor`]s.
///
/// Owns the dedup set of in-flight actions, per-type throttle timestamps and the
/// execution metrics. Cheap to share behind an `Arc`; every method takes `&self`.
pub struct ActionEngine {
    registry: Arc<VerbRegistry>,
    host: Arc<HostServices>,
    context: ExecutionContext,
    config: Arc<EngineConfig>,
    pending: DashSet<String>,
    last_executed: DashMap<String, Instant>,
    metrics: Arc<ExecutionMetrics>,
    events: ActionEventBus,
    performance_hook: Option<PerformanceHook>,
}

/// Clears the dedup marker however the dispatch ends.
struct PendingGuard<'a> {
    pending: &'a DashSet<String>,
    key: String,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.remove(&self.key);
    }
}

impl ActionEngine {
    pub fn new(host: HostServices, context: ExecutionContext, config: EngineConfig) -> Self {
        let metrics = Arc::new(ExecutionMetrics::new(
            config.metrics_window_cap,
            config.metrics_window_keep,
        ));
        Self {
            registry: Arc::new(VerbRegistry::with_builtins()),
            host: Arc::new(host),
            context,
            events: ActionEventBus::new(config.event_buffer_size),
            config: Arc::new(config),
            pending: DashSet::new(),
            last_executed: DashMap::new(),
            metrics,
            performance_hook: None,
        }
    }

    pub fn with_registry(mut self, registry: Arc<VerbRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<ExecutionMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_performance_hook(mut self, hook: PerformanceHook) -> Self {
        self.performance_hook = Some(hook);
        self
    }

    /// Runs `action` against the shared context, with `overlay`'s top-level
    /// keys layered on top for condition checks and payload interpolation.
    ///
    /// Skips (duplicate in flight, throttled, condition false) resolve to `Ok`.
    #[tracing::instrument(level = "debug", skip(self, action, overlay), fields(action_type = %action.action_type))]
    pub async fn execute_action(
        &self,
        action: &ActionDescriptor,
        overlay: Option<&Value>,
    ) -> ActionResult<()> {
        self.dispatch(action, overlay, None).await
    }

    /// Like [`execute_action`](Self::execute_action), for handlers that capture a
    /// user-entered value. `input` lands in the payload as `value` after
    /// interpolation, so it reaches the verb exactly as entered.
    #[tracing::instrument(level = "debug", skip(self, action, overlay, input), fields(action_type = %action.action_type))]
    pub async fn execute_with_input(
        &self,
        action: &ActionDescriptor,
        overlay: Option<&Value>,
        input: Option<&Value>,
    ) -> ActionResult<()> {
        self.dispatch(action, overlay, input).await
    }

    #[async_recursion]
    async fn dispatch(
        &self,
        action: &ActionDescriptor,
        overlay: Option<&'async_recursion Value>,
        input: Option<&'async_recursion Value>,
    ) -> ActionResult<()> {
        let mut key = action.dedup_key();
        if let Some(input) = input {
            key.push('|');
            key.push_str(&input.to_string());
        }
        if !self.pending.insert(key.clone()) {
            debug!("Action '{}' already pending, skipping", action.action_type);
            self.skip(action, SkipReason::AlreadyPending);
            return Ok(());
        }
        let guard = PendingGuard {
            pending: &self.pending,
            key,
        };

        if let Some(throttle) = action.throttle {
            let window = Duration::from_millis(throttle);
            let throttled = self
                .last_executed
                .get(&action.action_type)
                .is_some_and(|last| last.elapsed() < window);
            if throttled {
                debug!("Action '{}' throttled", action.action_type);
                self.skip(action, SkipReason::Throttled);
                return Ok(());
            }
        }

        if let Some(debounce) = action.debounce {
            tokio::time::sleep(Duration::from_millis(debounce)).await;
        }

        let scope = self.context.snapshot_with(overlay);
        if let Some(condition) = &action.condition {
            if !evaluate(condition, &scope) {
                debug!("Condition for '{}' is false, skipping", action.action_type);
                self.skip(action, SkipReason::ConditionFalse);
                return Ok(());
            }
        }

        self.last_executed
            .insert(action.action_type.clone(), Instant::now());
        self.metrics.record_executed();
        let started = Instant::now();

        let Some(handler) = self.registry.get(&action.action_type) else {
            self.record_performance(action, started.elapsed(), false);
            self.metrics.record_failure();
            error!("Unknown action type '{}'", action.action_type);
            return Err(ActionError::UnknownVerb(action.action_type.clone()));
        };

        let execution_id = uuid::Uuid::new_v4().to_string();
        self.publish(ActionEvent::Started {
            execution_id: execution_id.clone(),
            action_type: action.action_type.clone(),
        });

        let mut payload = interpolate_map(&action.payload, &scope);
        if let Some(input) = input {
            payload.insert("value".to_string(), input.clone());
        }
        let verb_ctx = VerbContext {
            host: self.host.clone(),
            context: self.context.clone(),
            config: self.config.clone(),
            component_id: action.component_id.clone(),
        };

        let outcome = self
            .run_with_retry(action, handler, &payload, &verb_ctx, &execution_id)
            .await;
        let elapsed = started.elapsed();
        self.record_performance(action, elapsed, outcome.is_ok());

        match outcome {
            Ok(()) => {
                self.metrics.record_success();
                self.publish(ActionEvent::Succeeded {
                    execution_id,
                    action_type: action.action_type.clone(),
                    duration: elapsed,
                });
                self.track_analytics(action, elapsed);
                Ok(())
            }
            Err(e) => {
                self.metrics.record_failure();
                error!("Action '{}' failed: {}", action.action_type, e);
                self.publish(ActionEvent::Failed {
                    execution_id,
                    action_type: action.action_type.clone(),
                    message: e.to_string(),
                });
                match &action.fallback {
                    Some(fallback) => {
                        let mut fallback = fallback.as_ref().clone();
                        if fallback.component_id.is_none() {
                            fallback.component_id = action.component_id.clone();
                        }
                        debug!("Running fallback '{}'", fallback.action_type);
                        // a fallback identical to its parent must not dedup against it
                        drop(guard);
                        self.dispatch(&fallback, overlay, input).await
                    }
                    None => Err(e),
                }
            }
        }
    }

    async fn run_with_retry(
        &self,
        action: &ActionDescriptor,
        handler: Arc<dyn VerbHandler>,
        payload: &Map<String, Value>,
        ctx: &VerbContext,
        execution_id: &str,
    ) -> ActionResult<()> {
        let max_attempts = action
            .retry
            .as_ref()
            .map(|retry| retry.max_attempts.max(1))
            .unwrap_or(1);

        let mut attempt = 1;
        loop {
            match handler.execute(payload, ctx).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < max_attempts => {
                    let delay = action
                        .retry
                        .as_ref()
                        .map(|retry| retry.delay_after(attempt))
                        .unwrap_or_default();
                    warn!(
                        "Action '{}' attempt {}/{} failed: {}; retrying in {:?}",
                        action.action_type, attempt, max_attempts, e, delay
                    );
                    self.metrics.record_retry();
                    self.publish(ActionEvent::Retrying {
                        execution_id: execution_id.to_string(),
                        action_type: action.action_type.clone(),
                        attempt,
                        delay,
                    });
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn skip(&self, action: &ActionDescriptor, reason: SkipReason) {
        self.publish(ActionEvent::Skipped {
            action_type: action.action_type.clone(),
            reason,
        });
    }

    fn publish(&self, event: ActionEvent) {
        if self.events.subscriber_count() > 0 {
            // a lagging or departed subscriber is not the dispatcher's problem
            let _ = self.events.publish(event);
        }
    }

    fn record_performance(&self, action: &ActionDescriptor, elapsed: Duration, success: bool) {
        self.metrics.record_duration(elapsed);
        if let Some(hook) = &self.performance_hook {
            hook(&PerformanceMetric {
                action_type: action.action_type.clone(),
                component_id: action.component_id.clone(),
                duration_ms: elapsed.as_secs_f64() * 1000.0,
                success,
                timestamp: Utc::now(),
            });
        }
    }

    fn track_analytics(&self, action: &ActionDescriptor, elapsed: Duration) {
        let Some(analytics) = &action.analytics else {
            return;
        };
        let mut properties = analytics.properties.clone();
        properties.insert(
            "actionType".to_string(),
            Value::String(action.action_type.clone()),
        );
        if let Some(id) = &action.component_id {
            properties.insert("componentId".to_string(), Value::String(id.clone()));
        }
        if analytics.track_performance {
            properties.insert(
                "durationMs".to_string(),
                Value::from(elapsed.as_secs_f64() * 1000.0),
            );
        }
        let properties = Value::Object(properties);
        match &self.host.analytics {
            Some(sink) => sink.track(&analytics.event, &properties),
            None => info!(event = %analytics.event, %properties, "analytics"),
        }
    }

    pub fn evaluate_condition(&self, condition: &ConditionExpr, overlay: Option<&Value>) -> bool {
        evaluate(condition, &self.context.snapshot_with(overlay))
    }

    pub fn interpolate_payload(
        &self,
        payload: &Map<String, Value>,
        overlay: Option<&Value>,
    ) -> Map<String, Value> {
        interpolate_map(payload, &self.context.snapshot_with(overlay))
    }

    pub fn update_context(&self, update: Value) {
        self.context.merge(update);
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn host(&self) -> &Arc<HostServices> {
        &self.host
    }

    pub fn registry(&self) -> &Arc<VerbRegistry> {
        &self.registry
    }

    pub fn register_verb(&self, name: &str, handler: Arc<dyn VerbHandler>) {
        self.registry.register(name, handler);
    }

    pub fn subscribe(&self) -> ActionEventReceiver {
        self.events.subscribe()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn metrics_handle(&self) -> Arc<ExecutionMetrics> {
        self.metrics.clone()
    }

    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }

    /// Forgets throttle timestamps and in-flight markers.
    pub fn clear_cache(&self) {
        self.last_executed.clear();
        self.pending.clear();
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

fn interpolate_map(payload: &Map<String, Value>, scope: &Value) -> Map<String, Value> {
    match interpolate(&Value::Object(payload.clone()), scope) {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
