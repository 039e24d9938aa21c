use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{optional_str, required_str, VerbContext, VerbError, VerbHandler, VerbResult};
use crate::host::StateAction;

pub const STATE_UPDATE: &str = "state/update";

/// `updateState`: `{key, value}` or `{updates: {..}}`, forwarded to the host
/// store as a `state/update` action.
pub struct UpdateState;

#[async_trait]
impl VerbHandler for UpdateState {
    async fn execute(&self, payload: &Map<String, Value>, ctx: &VerbContext) -> VerbResult<()> {
        let updates = match (payload.get("updates"), optional_str(payload, "key")) {
            (Some(Value::Object(updates)), _) => Value::Object(updates.clone()),
            (Some(other), _) => {
                return Err(VerbError::InvalidField {
                    field: "updates",
                    message: format!("expected object, got {}", other),
                })
            }
            (None, Some(key)) => {
                let mut single = Map::new();
                single.insert(
                    key.to_string(),
                    payload.get("value").cloned().unwrap_or(Value::Null),
                );
                Value::Object(single)
            }
            (None, None) => return Err(VerbError::MissingField("key")),
        };

        let state = ctx
            .host
            .state
            .as_ref()
            .ok_or(VerbError::CapabilityUnavailable("state"))?;
        state.dispatch(StateAction {
            action_type: STATE_UPDATE.to_string(),
            payload: updates,
        })?;
        Ok(())
    }
}

/// `dispatch`: forwards `{type, payload}` verbatim.
pub struct Dispatch;

#[async_trait]
impl VerbHandler for Dispatch {
    async fn execute(&self, payload: &Map<String, Value>, ctx: &VerbContext) -> VerbResult<()> {
        let action_type = required_str(payload, "type")?;
        let state = ctx
            .host
            .state
            .as_ref()
            .ok_or(VerbError::CapabilityUnavailable("state"))?;
        state.dispatch(StateAction {
            action_type: action_type.to_string(),
            payload: payload.get("payload").cloned().unwrap_or(Value::Null),
        })?;
        Ok(())
    }
}

/// `refresh`: asks the config source to redeliver a screen (or all screens).
pub struct Refresh;

#[async_trait]
impl VerbHandler for Refresh {
    async fn execute(&self, payload: &Map<String, Value>, ctx: &VerbContext) -> VerbResult<()> {
        let screens = ctx
            .host
            .screens
            .as_ref()
            .ok_or(VerbError::CapabilityUnavailable("screen source"))?;
        screens.request_refresh(optional_str(payload, "screen").map(str::to_string))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::verbs::test_support::{payload, verb_context};
    use crate::host::{HostServices, MockScreenSource, MockStateDispatcher};
    use mockall::predicate::*;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_update_state_single_key() {
        let mut state = MockStateDispatcher::new();
        state
            .expect_dispatch()
            .with(eq(StateAction {
                action_type: STATE_UPDATE.into(),
                payload: json!({"phoneNumber": "555"}),
            }))
            .times(1)
            .returning(|_| Ok(()));
        let ctx = verb_context(HostServices::new().with_state(Arc::new(state)));

        UpdateState
            .execute(&payload(json!({"key": "phoneNumber", "value": "555"})), &ctx)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_state_bulk() {
        let mut state = MockStateDispatcher::new();
        state
            .expect_dispatch()
            .withf(|action| action.payload == json!({"a": 1, "b": 2}))
            .times(1)
            .returning(|_| Ok(()));
        let ctx = verb_context(HostServices::new().with_state(Arc::new(state)));

        UpdateState
            .execute(&payload(json!({"updates": {"a": 1, "b": 2}})), &ctx)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_state_verbs_fail_unwired() {
        let ctx = verb_context(HostServices::new());
        let result = UpdateState
            .execute(&payload(json!({"key": "a", "value": 1})), &ctx)
            .await;
        assert!(matches!(result, Err(VerbError::CapabilityUnavailable("state"))));

        let result = Dispatch
            .execute(&payload(json!({"type": "auth/logout"})), &ctx)
            .await;
        assert!(matches!(result, Err(VerbError::CapabilityUnavailable("state"))));

        let result = Refresh.execute(&payload(json!({})), &ctx).await;
        assert!(matches!(result, Err(VerbError::CapabilityUnavailable(_))));
    }

    #[tokio::test]
    async fn test_dispatch_forwards_type_and_payload() {
        let mut state = MockStateDispatcher::new();
        state
            .expect_dispatch()
            .withf(|action| action.action_type == "auth/logout" && action.payload == json!({"all": true}))
            .times(1)
            .returning(|_| Ok(()));
        let ctx = verb_context(HostServices::new().with_state(Arc::new(state)));

        Dispatch
            .execute(
                &payload(json!({"type": "auth/logout", "payload": {"all": true}})),
                &ctx,
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_refresh_named_screen() {
        let mut screens = MockScreenSource::new();
        screens
            .expect_request_refresh()
            .with(eq(Some("home".to_string())))
            .times(1)
            .returning(|_| Ok(()));
        let ctx = verb_context(HostServices::new().with_screens(Arc::new(screens)));

        Refresh
            .execute(&payload(json!({"screen": "home"})), &ctx)
            .await
            .unwrap();
    }
}
