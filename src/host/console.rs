//! Headless host used by the preview CLI: every capability is logged through
//! `tracing` and otherwise accepted. Alerts resolve with their first button.

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use super::{
    AlertPresenter, AlertRequest, AnalyticsSink, HostError, HostResult, NavigationMode, Navigator,
    ShareContent, ShareSheet, StateAction, StateDispatcher, UrlOpener, Vibration, Vibrator,
};

#[derive(Debug, Clone, Default)]
pub struct ConsoleHost;

impl Navigator for ConsoleHost {
    fn navigate(&self, mode: NavigationMode, route: &str, params: &Value) -> HostResult<()> {
        info!(%mode, route, %params, "navigate");
        Ok(())
    }
}

impl StateDispatcher for ConsoleHost {
    fn dispatch(&self, action: StateAction) -> HostResult<()> {
        info!(action_type = %action.action_type, payload = %action.payload, "dispatch");
        Ok(())
    }
}

#[async_trait]
impl AlertPresenter for ConsoleHost {
    async fn present(&self, alert: AlertRequest) -> HostResult<String> {
        info!(title = %alert.title, message = ?alert.message, "alert");
        Ok(alert
            .buttons
            .first()
            .map(|b| b.text.clone())
            .unwrap_or_else(|| "OK".to_string()))
    }
}

#[async_trait]
impl UrlOpener for ConsoleHost {
    async fn can_open(&self, url: &str) -> HostResult<bool> {
        Ok(["http://", "https://", "tel:", "mailto:"]
            .iter()
            .any(|scheme| url.starts_with(scheme)))
    }

    async fn open(&self, url: &str) -> HostResult<()> {
        if !self.can_open(url).await? {
            return Err(HostError::Failed(format!("cannot open {}", url)));
        }
        info!(url, "open url");
        Ok(())
    }
}

#[async_trait]
impl ShareSheet for ConsoleHost {
    async fn share(&self, content: ShareContent) -> HostResult<()> {
        info!(title = ?content.title, message = ?content.message, url = ?content.url, "share");
        Ok(())
    }
}

impl Vibrator for ConsoleHost {
    fn vibrate(&self, vibration: Vibration) -> HostResult<()> {
        info!(?vibration, "vibrate");
        Ok(())
    }
}

impl AnalyticsSink for ConsoleHost {
    fn track(&self, event: &str, properties: &Value) {
        info!(event, %properties, "analytics");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::AlertButton;

    #[tokio::test]
    async fn test_alert_resolves_with_first_button() {
        let host = ConsoleHost;
        let pressed = host
            .present(AlertRequest {
                title: "Hi".into(),
                message: None,
                buttons: vec![
                    AlertButton {
                        text: "Later".into(),
                        style: None,
                    },
                    AlertButton {
                        text: "OK".into(),
                        style: None,
                    },
                ],
            })
            .await
            .unwrap();
        assert_eq!(pressed, "Later");
    }

    #[tokio::test]
    async fn test_url_schemes() {
        let host = ConsoleHost;
        assert!(host.can_open("https://example.com").await.unwrap());
        assert!(!host.can_open("ftp://example.com").await.unwrap());
        assert!(host.open("javascript:alert(1)").await.is_err());
    }
}
