use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use super::{flag, optional_str, VerbContext, VerbError, VerbHandler, VerbResult};
use crate::host::NavigationMode;

/// `navigate`: `{navigateTo | screen, params?, mode? | replace? | reset?}`.
pub struct Navigate;

fn mode_of(payload: &Map<String, Value>) -> VerbResult<NavigationMode> {
    if let Some(mode) = optional_str(payload, "mode") {
        return match mode {
            "navigate" | "push" => Ok(NavigationMode::Navigate),
            "replace" => Ok(NavigationMode::Replace),
            "reset" => Ok(NavigationMode::Reset),
            other => Err(VerbError::InvalidField {
                field: "mode",
                message: format!("unknown navigation mode '{}'", other),
            }),
        };
    }
    Ok(if flag(payload, "reset") {
        NavigationMode::Reset
    } else if flag(payload, "replace") {
        NavigationMode::Replace
    } else {
        NavigationMode::Navigate
    })
}

#[async_trait]
impl VerbHandler for Navigate {
    async fn execute(&self, payload: &Map<String, Value>, ctx: &VerbContext) -> VerbResult<()> {
        let route = optional_str(payload, "navigateTo")
            .or_else(|| optional_str(payload, "screen"))
            .filter(|r| !r.is_empty())
            .ok_or(VerbError::MissingField("navigateTo"))?;
        let mode = mode_of(payload)?;
        let navigator = ctx
            .host
            .navigator
            .as_ref()
            .ok_or(VerbError::CapabilityUnavailable("navigation"))?;

        let params = payload.get("params").cloned().unwrap_or(Value::Null);
        debug!("Navigating ({}) to {}", mode, route);
        navigator.navigate(mode, route, &params)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::verbs::test_support::{payload, verb_context};
    use crate::host::{HostServices, MockNavigator};
    use mockall::predicate::*;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_navigate_with_params() {
        let mut navigator = MockNavigator::new();
        navigator
            .expect_navigate()
            .with(
                eq(NavigationMode::Navigate),
                eq("Profile"),
                eq(json!({"id": 7})),
            )
            .times(1)
            .returning(|_, _, _| Ok(()));
        let ctx = verb_context(HostServices::new().with_navigator(Arc::new(navigator)));

        Navigate
            .execute(&payload(json!({"navigateTo": "Profile", "params": {"id": 7}})), &ctx)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_reset_flag_and_screen_alias() {
        let mut navigator = MockNavigator::new();
        navigator
            .expect_navigate()
            .withf(|mode, route, _| *mode == NavigationMode::Reset && route == "Login")
            .times(1)
            .returning(|_, _, _| Ok(()));
        let ctx = verb_context(HostServices::new().with_navigator(Arc::new(navigator)));

        Navigate
            .execute(&payload(json!({"screen": "Login", "reset": true})), &ctx)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_fails_without_target_or_capability() {
        let ctx = verb_context(HostServices::new());
        let missing = Navigate.execute(&payload(json!({})), &ctx).await;
        assert!(matches!(missing, Err(VerbError::MissingField("navigateTo"))));

        let unwired = Navigate
            .execute(&payload(json!({"navigateTo": "Home"})), &ctx)
            .await;
        assert!(matches!(
            unwired,
            Err(VerbError::CapabilityUnavailable("navigation"))
        ));
    }
}
