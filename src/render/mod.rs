//! Component tree interpretation: from server JSON to [`Element`] trees.
pub mod boundary;
pub mod element;
pub mod input;
pub mod interpreter;
pub mod node;
pub mod registry;

use thiserror::Error;

pub use boundary::{BoundaryState, ErrorBoundary, RenderOutput};
pub use element::{Element, EventHandler};
pub use input::InputSemantic;
pub use interpreter::{ActionSink, RenderScope, TreeInterpreter};
pub use node::{ComponentNode, NodeConditions};
pub use registry::{PrimitiveFactory, PrimitiveInput, PrimitiveRegistry, PLACEHOLDER};

#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("Primitive '{kind}' could not be built: {message}")]
    Primitive { kind: String, message: String },
    #[error("Rendering failed: {0}")]
    Boundary(String),
}

pub type RenderResult<T> = Result<T, RenderError>;
