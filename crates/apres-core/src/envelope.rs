//! Device error envelope
//!
//! Every failing request is answered with a JSON body carrying
//! `errorCode` and `errorMessage`.

use serde::{Deserialize, Serialize};

/// JSON error body returned by the device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    /// HTTP-like error code (401, 404, 500, 503, ...)
    #[serde(default)]
    pub error_code: Option<u16>,
    /// Human-readable message
    #[serde(default)]
    pub error_message: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            error_code: Some(code),
            error_message: Some(message.into()),
        }
    }

    /// Message text, or an empty string when the device sent none
    pub fn message(&self) -> &str {
        self.error_message.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_wire_names() {
        let json = serde_json::to_value(ErrorEnvelope::new(503, "busy")).unwrap();
        assert_eq!(json["errorCode"], 503);
        assert_eq!(json["errorMessage"], "busy");
    }

    #[test]
    fn test_envelope_partial() {
        let env: ErrorEnvelope = serde_json::from_str(r#"{"errorMessage":"oops"}"#).unwrap();
        assert_eq!(env.error_code, None);
        assert_eq!(env.message(), "oops");
    }
}
