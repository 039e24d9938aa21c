use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{Map, Value};
use tracing::debug;

use super::{optional_str, required_str, VerbContext, VerbError, VerbHandler, VerbResult};

/// `apiCall`: `{url, method?, headers?, body?, timeoutMs?, storeAs?}`.
///
/// Any non-2xx status fails the verb. With `storeAs` the response body (JSON
/// when it parses, text otherwise) is written into the execution context.
#[derive(Default)]
pub struct ApiCall {
    client: Client,
}

impl ApiCall {
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl VerbHandler for ApiCall {
    async fn execute(&self, payload: &Map<String, Value>, ctx: &VerbContext) -> VerbResult<()> {
        let url = required_str(payload, "url")?;
        let method_name = optional_str(payload, "method").unwrap_or("GET").to_uppercase();
        let method = Method::from_str(&method_name).map_err(|e| VerbError::InvalidField {
            field: "method",
            message: e.to_string(),
        })?;
        let timeout = payload
            .get("timeoutMs")
            .and_then(Value::as_u64)
            .map(Duration::from_millis)
            .unwrap_or(ctx.config.api_timeout);

        let mut request = self.client.request(method, url).timeout(timeout);
        if let Some(Value::Object(headers)) = payload.get("headers") {
            for (name, value) in headers {
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                request = request.header(name.as_str(), value);
            }
        }
        match payload.get("body") {
            None | Some(Value::Null) => {}
            Some(Value::String(raw)) => request = request.body(raw.clone()),
            Some(body) => request = request.json(body),
        }

        debug!("{} {}", method_name, url);
        let response = request
            .send()
            .await
            .map_err(|e| VerbError::Network(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(VerbError::Http {
                status: status.as_u16(),
            });
        }

        if let Some(target) = optional_str(payload, "storeAs") {
            let text = response
                .text()
                .await
                .map_err(|e| VerbError::Network(e.to_string()))?;
            let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
            ctx.context.set(target, body);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::verbs::test_support::{payload, verb_context};
    use crate::host::HostServices;
    use serde_json::json;

    #[tokio::test]
    async fn test_non_success_status_fails() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/broken")
            .with_status(500)
            .create_async()
            .await;
        let ctx = verb_context(HostServices::new());

        let result = ApiCall::default()
            .execute(
                &payload(json!({"url": format!("{}/broken", server.url()), "method": "GET"})),
                &ctx,
            )
            .await;
        assert!(matches!(result, Err(VerbError::Http { status: 500 })));
    }

    #[tokio::test]
    async fn test_post_stores_json_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/otp")
            .match_header("x-client", "sdui")
            .match_body(mockito::Matcher::Json(json!({"phone": "555"})))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"requestId": "r-1"}"#)
            .create_async()
            .await;
        let ctx = verb_context(HostServices::new());

        ApiCall::default()
            .execute(
                &payload(json!({
                    "url": format!("{}/otp", server.url()),
                    "method": "post",
                    "headers": {"x-client": "sdui"},
                    "body": {"phone": "555"},
                    "storeAs": "otp.request"
                })),
                &ctx,
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(ctx.context.get("otp.request.requestId"), Some(json!("r-1")));
    }

    #[tokio::test]
    async fn test_missing_url() {
        let ctx = verb_context(HostServices::new());
        let result = ApiCall::default().execute(&payload(json!({})), &ctx).await;
        assert!(matches!(result, Err(VerbError::MissingField("url"))));
    }
}
