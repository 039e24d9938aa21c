//! Action execution: descriptors, the verb catalog and the engine that runs them.
pub mod descriptor;
pub mod engine;
pub mod event;
pub mod metrics;
pub mod verbs;

use thiserror::Error;

pub use descriptor::{ActionDescriptor, AnalyticsConfig, Backoff, RetryConfig};
pub use engine::{ActionEngine, PerformanceHook};
pub use event::{ActionEvent, ActionEventBus, ActionEventReceiver, EventError, SkipReason};
pub use metrics::{ExecutionMetrics, MetricsSnapshot, PerformanceMetric};
pub use verbs::{VerbContext, VerbError, VerbHandler, VerbRegistry, VerbResult};

#[derive(Debug, Clone, Error)]
pub enum ActionError {
    #[error("Unknown action type: {0}")]
    UnknownVerb(String),
    #[error("Verb failed: {0}")]
    Verb(#[from] VerbError),
    #[error("Action handler failed: {0}")]
    Override(String),
}

pub type ActionResult<T> = Result<T, ActionError>;
