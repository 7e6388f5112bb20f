//! WebSocket frame protocol.
//!
//! Every frame in either direction is a JSON object
//! `{"event": "<name>", "data": {...}}`. Server frames are the serialized
//! [`ObserverEvent`](crate::domain::messaging::ObserverEvent)s; this module
//! holds the client side.

use serde::Deserialize;
use std::fmt;
use uuid::Uuid;

use crate::domain::messaging::{DispatchError, SendRequest};

// ============================================
// Client → Server Messages
// ============================================

/// Commands an observer can send.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientMessage {
    SendMessages(SendMessagesPayload),
    Logout,
    DemoConnect,
}

/// Raw `send-messages` body. Every field is optional on the wire so that a
/// missing one can be reported instead of failing the whole frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagesPayload {
    #[serde(default)]
    pub target_number: Option<String>,
    #[serde(default)]
    pub message_count: Option<i64>,
    /// Pause between messages in milliseconds.
    #[serde(default)]
    pub delay: Option<i64>,
}

impl SendMessagesPayload {
    /// Checks presence only. Ranges and the recipient are validated later.
    pub fn into_request(self) -> Result<SendRequest, DispatchError> {
        match (self.target_number, self.message_count, self.delay) {
            (Some(target), Some(count), Some(delay)) if !target.trim().is_empty() => {
                Ok(SendRequest::new(target, count, delay))
            }
            _ => Err(DispatchError::MissingFields),
        }
    }
}

impl ClientMessage {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Unique identifier for a WebSocket client connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_send_messages() {
        let msg = ClientMessage::parse(
            r#"{"event":"send-messages","data":{"targetNumber":"+12345678901","messageCount":3,"delay":1500}}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::SendMessages(SendMessagesPayload {
                target_number: Some("+12345678901".into()),
                message_count: Some(3),
                delay: Some(1500),
            })
        );
    }

    #[test]
    fn parses_unit_commands_without_data() {
        assert_eq!(
            ClientMessage::parse(r#"{"event":"logout"}"#).unwrap(),
            ClientMessage::Logout
        );
        assert_eq!(
            ClientMessage::parse(r#"{"event":"demo-connect","data":null}"#).unwrap(),
            ClientMessage::DemoConnect
        );
    }

    #[test]
    fn unknown_event_is_rejected() {
        assert!(ClientMessage::parse(r#"{"event":"reboot"}"#).is_err());
    }

    #[test]
    fn missing_fields_are_reported() {
        let payload = SendMessagesPayload {
            target_number: Some("+12345678901".into()),
            message_count: None,
            delay: Some(1_000),
        };
        assert_eq!(payload.into_request(), Err(DispatchError::MissingFields));
    }

    #[test]
    fn blank_target_counts_as_missing() {
        let payload = SendMessagesPayload {
            target_number: Some("  ".into()),
            message_count: Some(1),
            delay: Some(1_000),
        };
        assert_eq!(payload.into_request(), Err(DispatchError::MissingFields));
    }

    #[test]
    fn zero_count_is_left_to_range_validation() {
        let payload = SendMessagesPayload {
            target_number: Some("+12345678901".into()),
            message_count: Some(0),
            delay: Some(1_000),
        };
        let request = payload.into_request().unwrap();
        assert!(request.validate_ranges().is_err());
    }
}
