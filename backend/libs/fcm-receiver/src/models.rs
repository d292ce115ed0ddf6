use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::ReceiverError;

/// Default title for notifications raised from inbound pushes
pub const DEFAULT_NOTIFICATION_TITLE: &str = "Amazon SNS Test";

/// Inbound push payload: string keys to string values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushPayload {
    pub data: BTreeMap<String, String>,
}

/// Transport envelope: `{"data": {...}}`
#[derive(Debug, Deserialize)]
struct PushEnvelope {
    data: BTreeMap<String, String>,
}

impl PushPayload {
    pub fn new(data: BTreeMap<String, String>) -> Self {
        Self { data }
    }

    /// Parse either a flat `{"message": "..."}` object or a `{"data": {...}}` envelope
    pub fn from_json(json: &str) -> Result<Self, ReceiverError> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| ReceiverError::InvalidPayload(format!("Failed to parse payload: {}", e)))?;

        if value.get("data").map_or(false, |d| d.is_object()) {
            let envelope: PushEnvelope = serde_json::from_value(value).map_err(|e| {
                ReceiverError::InvalidPayload(format!("Invalid data envelope: {}", e))
            })?;
            return Ok(Self::new(envelope.data));
        }

        let data: BTreeMap<String, String> = serde_json::from_value(value).map_err(|e| {
            ReceiverError::InvalidPayload(format!("Payload values must be strings: {}", e))
        })?;
        Ok(Self::new(data))
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Display text: the `message` key, falling back to `default`
    pub fn message_text(&self) -> Option<&str> {
        self.data
            .get("message")
            .or_else(|| self.data.get("default"))
            .map(String::as_str)
    }
}

impl From<BTreeMap<String, String>> for PushPayload {
    fn from(data: BTreeMap<String, String>) -> Self {
        Self::new(data)
    }
}

/// Local notification shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalNotification {
    /// Distinct per second so several notifications can be shown at once
    pub id: i32,
    pub title: String,
    pub body: String,
    pub auto_cancel: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_payload() {
        let payload = PushPayload::from_json(r#"{"message": "hello"}"#).unwrap();
        assert_eq!(payload.message_text(), Some("hello"));
    }

    #[test]
    fn test_envelope_payload() {
        let payload = PushPayload::from_json(r#"{"data": {"default": "fallback"}}"#).unwrap();
        assert_eq!(payload.message_text(), Some("fallback"));
    }

    #[test]
    fn test_message_key_wins_over_default() {
        let payload =
            PushPayload::from_json(r#"{"message": "primary", "default": "fallback"}"#).unwrap();
        assert_eq!(payload.message_text(), Some("primary"));
    }

    #[test]
    fn test_neither_key() {
        let payload = PushPayload::from_json(r#"{"other": "x"}"#).unwrap();
        assert!(!payload.is_empty());
        assert_eq!(payload.message_text(), None);
    }

    #[test]
    fn test_invalid_payloads() {
        assert!(matches!(
            PushPayload::from_json("not json"),
            Err(ReceiverError::InvalidPayload(_))
        ));
        assert!(matches!(
            PushPayload::from_json(r#"{"message": 42}"#),
            Err(ReceiverError::InvalidPayload(_))
        ));
    }
}
