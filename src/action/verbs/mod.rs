//! Verb catalog: each verb turns a resolved payload into a host side effect.
//!
//! The registry is populated with the built-in verbs at startup; hosts register
//! their own domain verbs the same way and the engine dispatches to them without
//! distinction.
pub mod device;
pub mod form;
pub mod navigation;
pub mod network;
pub mod state;
pub mod storage;
pub mod telemetry;

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::config::EngineConfig;
use crate::eval::ExecutionContext;
use crate::host::{HostError, HostServices};

#[derive(Debug, Clone, Error)]
pub enum VerbError {
    #[error("Missing required payload field '{0}'")]
    MissingField(&'static str),
    #[error("Invalid payload field '{field}': {message}")]
    InvalidField { field: &'static str, message: String },
    #[error("No {0} capability is wired")]
    CapabilityUnavailable(&'static str),
    #[error("Unsupported: {0}")]
    Unsupported(String),
    #[error("HTTP request failed with status {status}")]
    Http { status: u16 },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Host error: {0}")]
    Host(#[from] HostError),
}

pub type VerbResult<T> = Result<T, VerbError>;

/// Everything a verb may touch while executing.
#[derive(Clone)]
pub struct VerbContext {
    pub host: Arc<HostServices>,
    pub context: ExecutionContext,
    pub config: Arc<EngineConfig>,
    pub component_id: Option<String>,
}

#[mockall::automock]
#[async_trait]
pub trait VerbHandler: Send + Sync {
    async fn execute(&self, payload: &Map<String, Value>, ctx: &VerbContext) -> VerbResult<()>;
}

#[derive(Default)]
pub struct VerbRegistry {
    verbs: DashMap<String, Arc<dyn VerbHandler>>,
}

impl VerbRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register_builtins();
        registry
    }

    fn register_builtins(&self) {
        self.register("navigate", Arc::new(navigation::Navigate));
        self.register("updateState", Arc::new(state::UpdateState));
        self.register("dispatch", Arc::new(state::Dispatch));
        self.register("refresh", Arc::new(state::Refresh));
        self.register("showAlert", Arc::new(device::ShowAlert));
        self.register("openUrl", Arc::new(device::OpenUrl));
        self.register("share", Arc::new(device::Share));
        self.register("vibrate", Arc::new(device::Vibrate));
        self.register("apiCall", Arc::new(network::ApiCall::default()));
        self.register("storage", Arc::new(storage::Storage));
        self.register("validateForm", Arc::new(form::ValidateForm));
        self.register("analytics", Arc::new(telemetry::Analytics));
        self.register("log", Arc::new(telemetry::Log));
    }

    /// Registers `handler` under `name`, replacing any previous entry.
    pub fn register(&self, name: &str, handler: Arc<dyn VerbHandler>) {
        if self.verbs.insert(name.to_string(), handler).is_some() {
            debug!("Verb '{}' replaced", name);
        }
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.verbs.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn VerbHandler>> {
        self.verbs.get(name).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.verbs.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.verbs.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

pub(crate) fn required_str<'a>(
    payload: &'a Map<String, Value>,
    field: &'static str,
) -> VerbResult<&'a str> {
    match payload.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s),
        Some(Value::String(_)) | None | Some(Value::Null) => Err(VerbError::MissingField(field)),
        Some(other) => Err(VerbError::InvalidField {
            field,
            message: format!("expected string, got {}", other),
        }),
    }
}

pub(crate) fn optional_str<'a>(payload: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    payload.get(field).and_then(Value::as_str)
}

pub(crate) fn flag(payload: &Map<String, Value>, field: &str) -> bool {
    payload.get(field).and_then(Value::as_bool).unwrap_or(false)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn verb_context(host: HostServices) -> VerbContext {
        VerbContext {
            host: Arc::new(host),
            context: ExecutionContext::new(),
            config: Arc::new(EngineConfig::default()),
            component_id: None,
        }
    }

    pub fn payload(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}
