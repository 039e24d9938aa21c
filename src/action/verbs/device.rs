use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use super::{flag, optional_str, required_str, VerbContext, VerbError, VerbHandler, VerbResult};
use crate::host::{AlertButton, AlertRequest, ShareContent, Vibration};

/// `showAlert`: `{title, message?, buttons?}`. Completes when the alert is dismissed.
pub struct ShowAlert;

#[async_trait]
impl VerbHandler for ShowAlert {
    async fn execute(&self, payload: &Map<String, Value>, ctx: &VerbContext) -> VerbResult<()> {
        let title = required_str(payload, "title")?;
        let buttons: Vec<AlertButton> = match payload.get("buttons") {
            Some(value) => {
                serde_json::from_value(value.clone()).map_err(|e| VerbError::InvalidField {
                    field: "buttons",
                    message: e.to_string(),
                })?
            }
            None => Vec::new(),
        };
        let alerts = ctx
            .host
            .alerts
            .as_ref()
            .ok_or(VerbError::CapabilityUnavailable("alert"))?;

        let pressed = alerts
            .present(AlertRequest {
                title: title.to_string(),
                message: optional_str(payload, "message").map(str::to_string),
                buttons,
            })
            .await?;
        debug!("Alert '{}' dismissed with '{}'", title, pressed);
        Ok(())
    }
}

/// `openUrl`: `{url}`; the host is asked whether it can open the URL first.
pub struct OpenUrl;

#[async_trait]
impl VerbHandler for OpenUrl {
    async fn execute(&self, payload: &Map<String, Value>, ctx: &VerbContext) -> VerbResult<()> {
        let url = required_str(payload, "url")?;
        let urls = ctx
            .host
            .urls
            .as_ref()
            .ok_or(VerbError::CapabilityUnavailable("url opener"))?;
        if !urls.can_open(url).await? {
            return Err(VerbError::Unsupported(format!("cannot open URL {}", url)));
        }
        urls.open(url).await?;
        Ok(())
    }
}

/// `share`: `{title?, message?, url?}`; one of message or url is required.
pub struct Share;

#[async_trait]
impl VerbHandler for Share {
    async fn execute(&self, payload: &Map<String, Value>, ctx: &VerbContext) -> VerbResult<()> {
        let content = ShareContent {
            title: optional_str(payload, "title").map(str::to_string),
            message: optional_str(payload, "message").map(str::to_string),
            url: optional_str(payload, "url").map(str::to_string),
        };
        if content.message.is_none() && content.url.is_none() {
            return Err(VerbError::MissingField("message"));
        }
        let share = ctx
            .host
            .share
            .as_ref()
            .ok_or(VerbError::CapabilityUnavailable("share"))?;
        share.share(content).await?;
        Ok(())
    }
}

/// `vibrate`: `{duration?}` in ms, or `{pattern: [ms..], repeat?}`.
pub struct Vibrate;

fn millis_list(value: &Value) -> VerbResult<Vec<Duration>> {
    let invalid = || VerbError::InvalidField {
        field: "pattern",
        message: "expected an array of non-negative milliseconds".to_string(),
    };
    value
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|v| v.as_u64().map(Duration::from_millis).ok_or_else(invalid))
        .collect()
}

#[async_trait]
impl VerbHandler for Vibrate {
    async fn execute(&self, payload: &Map<String, Value>, ctx: &VerbContext) -> VerbResult<()> {
        let vibration = match (payload.get("pattern"), payload.get("duration")) {
            (Some(pattern), _) => Vibration::Pattern {
                pattern: millis_list(pattern)?,
                repeat: flag(payload, "repeat"),
            },
            (None, Some(duration)) => Vibration::Duration(Duration::from_millis(
                duration.as_u64().ok_or(VerbError::InvalidField {
                    field: "duration",
                    message: "expected non-negative milliseconds".to_string(),
                })?,
            )),
            (None, None) => Vibration::Duration(ctx.config.default_vibration),
        };
        let vibrator = ctx
            .host
            .vibrator
            .as_ref()
            .ok_or(VerbError::CapabilityUnavailable("vibration"))?;
        vibrator.vibrate(vibration)?;
        Ok(())
    }
}
