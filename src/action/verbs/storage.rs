use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{optional_str, required_str, VerbContext, VerbError, VerbHandler, VerbResult};

/// `storage`: `{operation: get|set|remove, key, value?, storeAs?}`.
///
/// `get` with `storeAs` writes the stored value (null when absent) into the
/// execution context.
pub struct Storage;

#[async_trait]
impl VerbHandler for Storage {
    async fn execute(&self, payload: &Map<String, Value>, ctx: &VerbContext) -> VerbResult<()> {
        let operation = required_str(payload, "operation")?;
        let key = required_str(payload, "key")?;
        let storage = ctx
            .host
            .storage
            .as_ref()
            .ok_or(VerbError::CapabilityUnavailable("storage"))?;

        match operation {
            "get" => {
                let value = storage.get(key).await?;
                if let Some(target) = optional_str(payload, "storeAs") {
                    ctx.context.set(target, value.unwrap_or(Value::Null));
                }
            }
            "set" => {
                let value = payload.get("value").cloned().unwrap_or(Value::Null);
                storage.set(key, value).await?;
            }
            "remove" => storage.remove(key).await?,
            other => {
                return Err(VerbError::InvalidField {
                    field: "operation",
                    message: format!("unknown storage operation '{}'", other),
                })
            }
        }
        Ok(())
    }
}
