use std::sync::Arc;

use sdui::{
    action::{verbs::MockVerbHandler, VerbError},
    host::{MockAlertPresenter, MockNavigator, MockStateDispatcher, NavigationMode},
    ActionError, ComponentNode, DynamicRenderer, ExecutionContext, HostServices,
};
use serde_json::{json, Value};

use super::nodes;

fn login_screen(api_base: &str) -> Vec<ComponentNode> {
    nodes(json!({
        "type": "View",
        "id": "login",
        "children": [
            {"type": "TextInput", "id": "phone-input", "props": {"placeholder": "Phone number"}},
            {"type": "Button", "id": "send-code", "props": {"title": "Send code"},
             "actions": {"onPress": {
                 "type": "apiCall",
                 "payload": {
                     "url": format!("{}/otp", api_base),
                     "method": "POST",
                     "body": {"phone": "{{phoneNumber}}"},
                     "storeAs": "otpRequest"
                 },
                 "fallback": {
                     "type": "showAlert",
                     "payload": {"title": "Could not send code", "buttons": [{"text": "OK"}]}
                 }
             }}}
        ]
    }))
}

#[tokio::test]
async fn test_phone_input_mirrors_into_state() {
    let mut state = MockStateDispatcher::new();
    state
        .expect_dispatch()
        .withf(|action| {
            action.action_type == "state/update" && action.payload == json!({"phoneNumber": "5551234"})
        })
        .times(1)
        .returning(|_| Ok(()));
    let renderer = DynamicRenderer::new(
        ExecutionContext::new(),
        HostServices::new().with_state(Arc::new(state)),
    );

    let output = renderer.render(&login_screen("http://unused"));
    let input = output.elements()[0].find_by_key("phone-input").unwrap();
    assert!(input.has_handler("onChangeText"));
    assert!(input
        .trigger("onChangeText", Some(json!("5551234")))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_otp_input_keeps_declared_handler() {
    let mut state = MockStateDispatcher::new();
    state
        .expect_dispatch()
        .withf(|action| action.payload == json!({"otp": "123456"}))
        .times(1)
        .returning(|_| Ok(()));
    let mut verb = MockVerbHandler::new();
    verb.expect_execute()
        .withf(|payload, ctx| {
            payload["value"] == json!("123456") && ctx.component_id.as_deref() == Some("otp-code")
        })
        .times(1)
        .returning(|_, _| Ok(()));

    let renderer = DynamicRenderer::new(
        ExecutionContext::new(),
        HostServices::new().with_state(Arc::new(state)),
    );
    renderer.register_verb("otpTyped", Arc::new(verb));

    let output = renderer.render(&nodes(json!({
        "type": "TextInput",
        "id": "otp-code",
        "props": {"placeholder": "Verification code"},
        "actions": {"onChangeText": {"type": "otpTyped"}}
    })));
    output.elements()[0]
        .trigger("onChangeText", Some(json!("123456")))
        .await
        .unwrap();
    assert_eq!(renderer.metrics().actions_succeeded, 2);
}

#[tokio::test]
async fn test_typed_placeholder_reaches_verb_verbatim() {
    let mut state = MockStateDispatcher::new();
    state
        .expect_dispatch()
        .withf(|action| action.payload == json!({"phoneNumber": "{{session.token}}"}))
        .times(1)
        .returning(|_| Ok(()));
    let mut verb = MockVerbHandler::new();
    verb.expect_execute()
        .withf(|payload, _| payload["value"] == json!("{{session.token}}"))
        .times(1)
        .returning(|_, _| Ok(()));
    let renderer = DynamicRenderer::new(
        ExecutionContext::from_value(json!({"session": {"token": "SECRET-123"}})),
        HostServices::new().with_state(Arc::new(state)),
    );
    renderer.register_verb("phoneTyped", Arc::new(verb));

    let output = renderer.render(&nodes(json!({
        "type": "TextInput",
        "id": "phone-input",
        "props": {"placeholder": "Phone number"},
        "actions": {"onChangeText": {"type": "phoneTyped"}}
    })));
    output.elements()[0]
        .trigger("onChangeText", Some(json!("{{session.token}}")))
        .await
        .unwrap();
    assert_eq!(renderer.metrics().actions_succeeded, 2);
}

#[tokio::test]
async fn test_send_code_stores_response() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/otp")
        .match_body(mockito::Matcher::Json(json!({"phone": "5551234"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"requestId": "r-42"}"#)
        .create_async()
        .await;
    let renderer = DynamicRenderer::new(
        ExecutionContext::from_value(json!({"phoneNumber": "5551234"})),
        HostServices::new(),
    );

    let output = renderer.render(&login_screen(&server.url()));
    let button = output.elements()[0].find_by_key("send-code").unwrap();
    assert!(button.trigger("onPress", None).await.unwrap());

    mock.assert_async().await;
    assert_eq!(
        renderer.context().get("otpRequest.requestId"),
        Some(json!("r-42"))
    );
    let metrics = renderer.metrics();
    assert_eq!(metrics.actions_succeeded, 1);
    assert_eq!(metrics.actions_failed, 0);
}

#[tokio::test]
async fn test_send_code_failure_shows_alert() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/otp")
        .with_status(500)
        .create_async()
        .await;
    let mut alerts = MockAlertPresenter::new();
    alerts
        .expect_present()
        .withf(|alert| alert.title == "Could not send code" && alert.buttons[0].text == "OK")
        .times(1)
        .returning(|alert| Ok(alert.buttons[0].text.clone()));
    let renderer = DynamicRenderer::new(
        ExecutionContext::from_value(json!({"phoneNumber": "5551234"})),
        HostServices::new().with_alerts(Arc::new(alerts)),
    );

    let output = renderer.render(&login_screen(&server.url()));
    let button = output.elements()[0].find_by_key("send-code").unwrap();
    button.trigger("onPress", None).await.unwrap();

    assert!(!renderer.context().contains("otpRequest"));
    let metrics = renderer.metrics();
    assert_eq!(metrics.actions_executed, 2);
    assert_eq!(metrics.actions_failed, 1);
    assert_eq!(metrics.actions_succeeded, 1);
}

#[tokio::test(start_paused = true)]
async fn test_double_tap_navigates_once() {
    let mut navigator = MockNavigator::new();
    navigator
        .expect_navigate()
        .withf(|mode, route, params| {
            *mode == NavigationMode::Navigate && route == "Verify" && params == &json!({"phone": "5551234"})
        })
        .times(1)
        .returning(|_, _, _| Ok(()));
    let renderer = DynamicRenderer::new(
        ExecutionContext::from_value(json!({"phoneNumber": "5551234"})),
        HostServices::new().with_navigator(Arc::new(navigator)),
    );

    let output = renderer.render(&nodes(json!({
        "type": "Button",
        "id": "continue",
        "props": {"title": "Continue"},
        "actions": {"onPress": {
            "type": "navigate",
            "payload": {"navigateTo": "Verify", "params": {"phone": "{{phoneNumber}}"}},
            "debounce": 300
        }}
    })));
    let button = &output.elements()[0];

    let (first, second) = tokio::join!(
        button.trigger("onPress", None),
        button.trigger("onPress", None)
    );
    assert!(first.unwrap());
    assert!(second.unwrap());
    assert_eq!(renderer.metrics().actions_executed, 1);
}

#[tokio::test]
async fn test_short_phone_number_fails_validation() {
    let renderer = DynamicRenderer::new(
        ExecutionContext::from_value(json!({"phoneNumber": "555"})),
        HostServices::new(),
    );
    let output = renderer.render(&nodes(json!({
        "type": "Button",
        "id": "validate",
        "actions": {"onPress": {
            "type": "validateForm",
            "payload": {"fields": [
                {"name": "phoneNumber", "label": "Phone number",
                 "rules": {"required": true, "minLength": 10}}
            ]}
        }}
    })));

    let result = output.elements()[0].trigger("onPress", None).await;
    match result {
        Err(ActionError::Verb(VerbError::Validation(message))) => {
            assert_eq!(message, "Phone number must be at least 10 characters")
        }
        other => panic!("expected validation failure, got {:?}", other),
    }

    renderer.update_context(json!({"phoneNumber": "5551234567"}));
    let output = renderer.render(&nodes(json!({"type": "Text", "props": {"text": "{{phoneNumber}}"}})));
    assert_eq!(output.elements()[0].text(), Some("5551234567"));
}

#[tokio::test]
async fn test_custom_action_handler_short_circuits() {
    use futures::FutureExt;
    use sdui::ActionDescriptor;

    let mut navigator = MockNavigator::new();
    navigator.expect_navigate().times(0);
    let renderer = DynamicRenderer::builder()
        .host(HostServices::new().with_navigator(Arc::new(navigator)))
        .on_action(Arc::new(|action: ActionDescriptor, _: Option<Value>| {
            async move { Ok::<bool, ActionError>(action.action_type == "navigate") }.boxed()
        }))
        .build();

    let output = renderer.render(&nodes(json!({
        "type": "Button",
        "id": "home",
        "actions": {"onPress": {"type": "navigate", "payload": {"navigateTo": "Home"}}}
    })));
    assert!(output.elements()[0].trigger("onPress", None).await.unwrap());
    assert_eq!(renderer.metrics().actions_executed, 0);
}
