//! Host capabilities the verbs translate into.
//!
//! Every capability is optional. A verb whose capability is not wired fails with
//! [`crate::action::VerbError::CapabilityUnavailable`] rather than silently
//! succeeding.
pub mod console;
pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::screen::{ScreenConfig, ScreenStatus};

#[derive(Debug, Clone, Error)]
pub enum HostError {
    #[error("Capability unavailable: {0}")]
    Unavailable(String),
    #[error("Host operation failed: {0}")]
    Failed(String),
}

pub type HostResult<T> = Result<T, HostError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum NavigationMode {
    Navigate,
    Replace,
    Reset,
}

#[mockall::automock]
pub trait Navigator: Send + Sync {
    fn navigate(&self, mode: NavigationMode, route: &str, params: &Value) -> HostResult<()>;
}

/// Redux-style action forwarded to the host's state store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateAction {
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default)]
    pub payload: Value,
}

#[mockall::automock]
pub trait StateDispatcher: Send + Sync {
    fn dispatch(&self, action: StateAction) -> HostResult<()>;
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AlertButton {
    pub text: String,
    #[serde(default)]
    pub style: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AlertRequest {
    pub title: String,
    pub message: Option<String>,
    pub buttons: Vec<AlertButton>,
}

#[mockall::automock]
#[async_trait]
pub trait AlertPresenter: Send + Sync {
    /// Resolves once the user dismisses the alert, with the pressed button's text.
    async fn present(&self, alert: AlertRequest) -> HostResult<String>;
}

#[mockall::automock]
#[async_trait]
pub trait UrlOpener: Send + Sync {
    async fn can_open(&self, url: &str) -> HostResult<bool>;
    async fn open(&self, url: &str) -> HostResult<()>;
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShareContent {
    pub title: Option<String>,
    pub message: Option<String>,
    pub url: Option<String>,
}

#[mockall::automock]
#[async_trait]
pub trait ShareSheet: Send + Sync {
    async fn share(&self, content: ShareContent) -> HostResult<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Vibration {
    Duration(Duration),
    Pattern { pattern: Vec<Duration>, repeat: bool },
}

#[mockall::automock]
pub trait Vibrator: Send + Sync {
    fn vibrate(&self, vibration: Vibration) -> HostResult<()>;
}

#[mockall::automock]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> HostResult<Option<Value>>;
    async fn set(&self, key: &str, value: Value) -> HostResult<()>;
    async fn remove(&self, key: &str) -> HostResult<()>;
}

#[mockall::automock]
pub trait AnalyticsSink: Send + Sync {
    fn track(&self, event: &str, properties: &Value);
}

/// Source of screen trees (the real-time config delivery channel).
#[mockall::automock]
pub trait ScreenSource: Send + Sync {
    fn screen(&self, name: &str) -> Option<ScreenConfig>;
    fn status(&self, name: &str) -> ScreenStatus;
    fn request_refresh(&self, name: Option<String>) -> HostResult<()>;
}

/// Bundle of the capabilities wired by the host.
#[derive(Clone, Default)]
pub struct HostServices {
    pub navigator: Option<Arc<dyn Navigator>>,
    pub state: Option<Arc<dyn StateDispatcher>>,
    pub alerts: Option<Arc<dyn AlertPresenter>>,
    pub urls: Option<Arc<dyn UrlOpener>>,
    pub share: Option<Arc<dyn ShareSheet>>,
    pub vibrator: Option<Arc<dyn Vibrator>>,
    pub storage: Option<Arc<dyn KeyValueStore>>,
    pub analytics: Option<Arc<dyn AnalyticsSink>>,
    pub screens: Option<Arc<dyn ScreenSource>>,
}

impl HostServices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn with_state(mut self, state: Arc<dyn StateDispatcher>) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_alerts(mut self, alerts: Arc<dyn AlertPresenter>) -> Self {
        self.alerts = Some(alerts);
        self
    }

    pub fn with_urls(mut self, urls: Arc<dyn UrlOpener>) -> Self {
        self.urls = Some(urls);
        self
    }

    pub fn with_share(mut self, share: Arc<dyn ShareSheet>) -> Self {
        self.share = Some(share);
        self
    }

    pub fn with_vibrator(mut self, vibrator: Arc<dyn Vibrator>) -> Self {
        self.vibrator = Some(vibrator);
        self
    }

    pub fn with_storage(mut self, storage: Arc<dyn KeyValueStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_analytics(mut self, analytics: Arc<dyn AnalyticsSink>) -> Self {
        self.analytics = Some(analytics);
        self
    }

    pub fn with_screens(mut self, screens: Arc<dyn ScreenSource>) -> Self {
        self.screens = Some(screens);
        self
    }
}

impl std::fmt::Debug for HostServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostServices")
            .field("navigator", &self.navigator.is_some())
            .field("state", &self.state.is_some())
            .field("alerts", &self.alerts.is_some())
            .field("urls", &self.urls.is_some())
            .field("share", &self.share.is_some())
            .field("vibrator", &self.vibrator.is_some())
            .field("storage", &self.storage.is_some())
            .field("analytics", &self.analytics.is_some())
            .field("screens", &self.screens.is_some())
            .finish()
    }
}
