use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use futures::FutureExt;
use serde_json::json;
use tracing::{error, info};

use super::element::{Element, EventHandler};
use super::{RenderError, RenderResult};
use crate::action::ActionError;

pub const FALLBACK_KIND: &str = "ErrorFallback";
pub const RETRY_KEY: &str = "error-boundary-retry";
const FALLBACK_TEXT: &str = "Something went wrong";

#[derive(Debug, Clone, PartialEq, Default)]
pub enum BoundaryState {
    #[default]
    Clear,
    Tripped { message: String },
}

#[derive(Debug)]
pub enum RenderOutput {
    Tree(Vec<Element>),
    Fallback(Element),
}

impl RenderOutput {
    pub fn is_fallback(&self) -> bool {
        matches!(self, RenderOutput::Fallback(_))
    }

    pub fn elements(&self) -> &[Element] {
        match self {
            RenderOutput::Tree(elements) => elements,
            RenderOutput::Fallback(element) => std::slice::from_ref(element),
        }
    }
}

/// Tree-level containment: a failing render is replaced by a fallback element
/// whose retry button clears the tripped state. Stays tripped until then.
#[derive(Debug, Clone, Default)]
pub struct ErrorBoundary {
    state: Arc<RwLock<BoundaryState>>,
}

impl ErrorBoundary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> BoundaryState {
        self.state
            .read()
            .map(|state| state.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn is_tripped(&self) -> bool {
        matches!(self.state(), BoundaryState::Tripped { .. })
    }

    pub fn reset(&self) {
        self.set(BoundaryState::Clear);
    }

    fn set(&self, next: BoundaryState) {
        match self.state.write() {
            Ok(mut state) => *state = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    /// Runs `render`, turning an error or a panic into the fallback element.
    /// `on_error` sees the failure once, when the boundary trips.
    pub fn render_safely<F, E>(&self, render: F, on_error: E) -> RenderOutput
    where
        F: FnOnce() -> RenderResult<Vec<Element>>,
        E: FnOnce(&RenderError),
    {
        if let BoundaryState::Tripped { message } = self.state() {
            return RenderOutput::Fallback(self.fallback(&message));
        }

        let failure = match panic::catch_unwind(AssertUnwindSafe(render)) {
            Ok(Ok(elements)) => return RenderOutput::Tree(elements),
            Ok(Err(e)) => e,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "panic while rendering".to_string());
                RenderError::Boundary(message)
            }
        };

        error!("Rendering failed, showing fallback: {}", failure);
        on_error(&failure);
        let message = failure.to_string();
        self.set(BoundaryState::Tripped {
            message: message.clone(),
        });
        RenderOutput::Fallback(self.fallback(&message))
    }

    fn fallback(&self, message: &str) -> Element {
        let boundary = self.clone();
        let retry: EventHandler = Arc::new(move |_: Option<serde_json::Value>| {
            info!("Error boundary reset");
            boundary.reset();
            async { Ok::<(), ActionError>(()) }.boxed()
        });

        let mut button = Element::new("Button")
            .with_prop("title", json!("Retry"))
            .with_handler("onPress", retry);
        button.key = Some(RETRY_KEY.to_string());

        Element::new(FALLBACK_KIND)
            .with_prop("message", json!(FALLBACK_TEXT))
            .with_prop("error", json!(message))
            .with_child(Element::new("Text").with_prop("text", json!(FALLBACK_TEXT)))
            .with_child(button)
    }
}
