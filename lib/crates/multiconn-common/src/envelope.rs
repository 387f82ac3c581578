//! Request and response envelopes of the Archicad JSON endpoint.

use serde_json::{Map, Value, json};

use crate::types::{ApiError, CommandResult};

/// Native command used to reach add-on (sub-)commands.
pub const ADD_ON_COMMAND: &str = "API.ExecuteAddOnCommand";
/// Namespace of the Tapir add-on commands the core relies on.
pub const TAPIR_NAMESPACE: &str = "TapirCommand";

/// `{"command": .., "parameters": ..}`
#[must_use]
pub fn command_body(command: &str, parameters: Value) -> Value {
    json!({ "command": command, "parameters": parameters })
}

/// Parameters of an `API.ExecuteAddOnCommand` call wrapping `name`.
#[must_use]
pub fn add_on_parameters(namespace: &str, name: &str, parameters: Value) -> Value {
    json!({
        "addOnCommandId": {
            "commandNamespace": namespace,
            "commandName": name,
        },
        "addOnCommandParameters": parameters,
    })
}

/// Unwrap a native response envelope into its `result` or `error`.
///
/// # Errors
///
/// The envelope's `error` when `succeeded` is false, or a malformed record
/// when the body is not an envelope at all.
pub fn parse_envelope(body: Value) -> CommandResult<Value> {
    let Value::Object(mut obj) = body else {
        return Err(ApiError::malformed("response is not a JSON object"));
    };
    let succeeded = obj
        .get("succeeded")
        .and_then(Value::as_bool)
        .ok_or_else(|| ApiError::malformed("response has no 'succeeded' flag"))?;
    if !succeeded {
        return Err(ApiError::from_error_value(obj.get("error")));
    }
    Ok(obj
        .remove("result")
        .unwrap_or_else(|| Value::Object(Map::new())))
}

/// Flatten the `result` of an add-on call to the add-on's own response.
///
/// # Errors
///
/// A malformed record when `addOnCommandResponse` is missing, or the nested
/// `error` when the add-on reports `success: false`.
pub fn flatten_add_on(result: Value) -> CommandResult<Value> {
    let Value::Object(mut obj) = result else {
        return Err(ApiError::malformed("add-on result is not a JSON object"));
    };
    let response = obj
        .remove("addOnCommandResponse")
        .ok_or_else(|| ApiError::malformed("result has no 'addOnCommandResponse'"))?;
    if response.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(ApiError::from_error_value(response.get("error")));
    }
    Ok(response)
}
