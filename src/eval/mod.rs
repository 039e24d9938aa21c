//! Pure evaluation helpers shared by the renderer and the action engine:
//! dotted-path lookup, the condition language and template interpolation.
pub mod condition;
pub mod context;
pub mod path;
pub mod template;

pub use condition::{evaluate, ConditionExpr, EvalError, Operator};
pub use context::{layer, ExecutionContext};
pub use template::{interpolate, interpolate_str};
