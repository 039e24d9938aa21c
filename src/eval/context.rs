use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::{Map, Value};
use tracing::warn;

use super::path;

struct State {
    revision: u64,
    data: Arc<Value>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            revision: 0,
            data: Arc::new(Value::Object(Map::new())),
        }
    }
}

impl State {
    /// Copies the data only when a snapshot still holds the current version.
    fn data_mut(&mut self) -> &mut Value {
        self.revision += 1;
        Arc::make_mut(&mut self.data)
    }
}

/// Shared handle over the host's global data.
///
/// The data is an immutable JSON object behind an `Arc`; snapshots are cheap
/// pointer copies and writers copy on write. Every write bumps `revision`, so
/// two snapshots with the same revision hold the same data. Cloning the handle
/// shares the underlying state.
#[derive(Clone, Default)]
pub struct ExecutionContext {
    state: Arc<RwLock<State>>,
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("ExecutionContext")
            .field("revision", &state.revision)
            .field("keys", &state.data.as_object().map_or(0, Map::len))
            .finish()
    }
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(value: Value) -> Self {
        let context = Self::new();
        context.merge(value);
        context
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, path: &str) -> Option<Value> {
        path::resolve(&self.read().data, path).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        path::resolve(&self.read().data, path).is_some()
    }

    pub fn set(&self, path: &str, value: Value) {
        if path::segments(path).next().is_none() {
            warn!("Ignoring context write with empty path");
            return;
        }
        path::set(self.write().data_mut(), path, value);
    }

    pub fn remove(&self, path: &str) -> Option<Value> {
        let mut state = self.write();
        path::resolve(&state.data, path)?;
        path::remove(state.data_mut(), path)
    }

    /// Shallow merge: each top-level key of `update` replaces the existing one.
    pub fn merge(&self, update: Value) {
        match update {
            Value::Object(map) => {
                if let Value::Object(base) = self.write().data_mut() {
                    base.extend(map);
                }
            }
            Value::Null => {}
            other => warn!("Ignoring non-object context update: {}", other),
        }
    }

    pub fn clear(&self) {
        let mut state = self.write();
        state.revision += 1;
        state.data = Arc::new(Value::Object(Map::new()));
    }

    /// Bumped by every write.
    pub fn revision(&self) -> u64 {
        self.read().revision
    }

    pub fn snapshot(&self) -> Arc<Value> {
        self.read().data.clone()
    }

    /// Snapshot together with the revision it was taken at.
    pub fn versioned_snapshot(&self) -> (u64, Arc<Value>) {
        let state = self.read();
        (state.revision, state.data.clone())
    }

    /// Snapshot with `overlay`'s top-level keys layered on top, without
    /// touching the shared state. Only an overlay forces a copy.
    pub fn snapshot_with(&self, overlay: Option<&Value>) -> Arc<Value> {
        layer(self.snapshot(), overlay)
    }
}

/// Layers `overlay`'s top-level keys onto `base`.
pub fn layer(base: Arc<Value>, overlay: Option<&Value>) -> Arc<Value> {
    match overlay {
        Some(Value::Object(extra)) if !extra.is_empty() => {
            let mut merged = (*base).clone();
            if let Value::Object(map) = &mut merged {
                for (key, value) in extra {
                    map.insert(key.clone(), value.clone());
                }
            }
            Arc::new(merged)
        }
        _ => base,
    }
}
