//! # SDUI: Backend-Driven UI Interpreter
//!
//! SDUI turns component trees delivered by a backend into rendered element trees
//! and runs the declarative actions attached to them, so screens can change
//! without shipping a new client.
//!
//! ## Building Blocks
//!
//! ### 1. Evaluation
//! Pure helpers shared by rendering and action execution ([`eval`]):
//! - Dotted-path lookup over JSON ([`eval::path`])
//! - The condition language deciding visibility and enablement ([`eval::condition`])
//! - `{{path}}` template interpolation ([`eval::template`])
//! - The shared, read-mostly execution context ([`eval::context`])
//!
//! ### 2. Tree Interpretation
//! [`render`] walks [`render::ComponentNode`] trees: conditions are checked, props
//! interpolated, event handlers bound, and each node is built by the primitive
//! registered for its type. Depth is bounded and results are memoized. Failures
//! are contained by [`render::ErrorBoundary`].
//!
//! ### 3. Action Execution
//! [`action`] runs [`action::ActionDescriptor`]s with deduplication, throttling,
//! debouncing, condition guards, retry with backoff, fallback chaining, analytics
//! and metrics. Verbs live in a registry hosts can extend.
//!
//! ### 4. Host Capabilities
//! Navigation, state, alerts, URLs, sharing, vibration, storage, analytics and
//! screen delivery are traits in [`host`]; every one is optional.
//!
//! ## Pipeline
//!
//! ```text
//! Screen JSON → ComponentNode → TreeInterpreter → Element tree
//!                                     │ (event)
//!                                     ▼
//!                 ActionDescriptor → ActionEngine → Verb → Host capability
//! ```
//!
//! [`renderer::DynamicRenderer`] wires all of the above together.

pub mod action;
pub mod config;
pub mod error;
pub mod eval;
pub mod host;
pub mod render;
pub mod renderer;
pub mod screen;

// Re-exports
pub use action::{ActionDescriptor, ActionEngine, ActionError, ActionResult, MetricsSnapshot};
pub use config::SduiConfig;
pub use error::*;
pub use eval::{evaluate, interpolate, ConditionExpr, ExecutionContext, Operator};
pub use host::HostServices;
pub use render::{ComponentNode, Element, RenderError, RenderOutput};
pub use renderer::DynamicRenderer;
pub use screen::{ScreenConfig, ScreenStatus};
