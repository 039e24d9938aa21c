use serde_json::{json, Map, Value};

use crate::action::ActionDescriptor;

/// What a text input is for, guessed from its id and placeholder so edits can
/// be mirrored into host state without the tree declaring it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum InputSemantic {
    Phone,
    Otp,
}

const PHONE_HINTS: [&str; 2] = ["phone", "mobile"];
const OTP_HINTS: [&str; 3] = ["otp", "code", "verification"];

impl InputSemantic {
    pub fn infer(id: Option<&str>, props: &Map<String, Value>) -> Option<Self> {
        let placeholder = props.get("placeholder").and_then(Value::as_str);
        let haystack = [id, placeholder]
            .into_iter()
            .flatten()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(" ");
        if haystack.is_empty() {
            return None;
        }
        if PHONE_HINTS.iter().any(|hint| haystack.contains(hint)) {
            Some(Self::Phone)
        } else if OTP_HINTS.iter().any(|hint| haystack.contains(hint)) {
            Some(Self::Otp)
        } else {
            None
        }
    }

    pub fn state_key(&self) -> &'static str {
        match self {
            Self::Phone => "phoneNumber",
            Self::Otp => "otp",
        }
    }

    /// `updateState` raised alongside the declared change action. The typed
    /// value travels separately as the captured input.
    pub fn state_update(&self, component_id: Option<&str>) -> ActionDescriptor {
        let mut action =
            ActionDescriptor::new("updateState").with_payload(json!({ "key": self.state_key() }));
        action.component_id = component_id.map(str::to_string);
        action
    }
}
