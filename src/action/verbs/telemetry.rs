use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, error, info, trace, warn};

use super::{optional_str, required_str, VerbContext, VerbHandler, VerbResult};

/// `analytics`: `{event, properties?}`. Goes to the host sink when wired, to
/// the log otherwise; never fails on a missing sink.
pub struct Analytics;

#[async_trait]
impl VerbHandler for Analytics {
    async fn execute(&self, payload: &Map<String, Value>, ctx: &VerbContext) -> VerbResult<()> {
        let event = required_str(payload, "event")?;
        let mut properties = match payload.get("properties") {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };
        if let Some(id) = &ctx.component_id {
            properties
                .entry("componentId")
                .or_insert_with(|| Value::String(id.clone()));
        }
        let properties = Value::Object(properties);

        match &ctx.host.analytics {
            Some(sink) => sink.track(event, &properties),
            None => info!(event, %properties, "analytics"),
        }
        Ok(())
    }
}

/// `log`: `{message, level?}` with level one of trace/debug/info/warn/error.
pub struct Log;

#[async_trait]
impl VerbHandler for Log {
    async fn execute(&self, payload: &Map<String, Value>, ctx: &VerbContext) -> VerbResult<()> {
        let message = required_str(payload, "message")?;
        let component = ctx.component_id.as_deref().unwrap_or("-");
        match optional_str(payload, "level").unwrap_or("info") {
            "trace" => trace!(component, "{}", message),
            "debug" => debug!(component, "{}", message),
            "warn" => warn!(component, "{}", message),
            "error" => error!(component, "{}", message),
            _ => info!(component, "{}", message),
        }
        Ok(())
    }
}
