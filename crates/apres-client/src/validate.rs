//! Response validation
//!
//! Every device reply passes through [`check_response`] before the caller
//! branches on status. JSON error envelopes carrying a known code become
//! typed errors; anything else is left for the caller.

use serde_json::Value;

use crate::error::{ApresError, Result};
use crate::transport::DeviceResponse;

/// Error code carried in an envelope, accepting numbers or numeric strings
fn envelope_code(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

/// Map a device error envelope to a typed error
pub fn check_response(response: &DeviceResponse) -> Result<()> {
    if !response.is_json() {
        return Ok(());
    }
    let Ok(Value::Object(body)) = serde_json::from_slice::<Value>(&response.body) else {
        return Ok(());
    };
    if !body.contains_key("errorCode") && !body.contains_key("errorMessage") {
        return Ok(());
    }

    let message = body
        .get("errorMessage")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    match body.get("errorCode").and_then(envelope_code) {
        Some(401) => Err(ApresError::InvalidCredentials(message)),
        Some(404) => Err(ApresError::NotFound(message)),
        Some(500) => Err(ApresError::DeviceInternalError(message)),
        Some(503) => Err(ApresError::DeviceBusy(message)),
        _ => Ok(()),
    }
}
