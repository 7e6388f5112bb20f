//! Events pushed to observers.
//!
//! Every event serializes as `{"event": "<name>", "data": {...}}`, with the
//! kebab-case event names observers subscribe to.

use serde::{Deserialize, Serialize};

use super::connection::ConnectionState;
use super::request::SendOutcome;

/// An outbound observer event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ObserverEvent {
    ConnectionState(ConnectionStatePayload),
    Qr(QrPayload),
    Connected(NoticePayload),
    LoggedOut(NoticePayload),
    Error(NoticePayload),
    MessageProgress(ProgressPayload),
    MessageError(MessageErrorPayload),
    SendComplete(SendOutcome),
    SendError(NoticePayload),
}

impl ObserverEvent {
    pub fn connection_state(state: ConnectionState, demo_mode: bool) -> Self {
        ObserverEvent::ConnectionState(ConnectionStatePayload {
            state,
            connected: state.is_connected(),
            demo_mode,
        })
    }

    pub fn qr(encoded_challenge: impl Into<String>) -> Self {
        ObserverEvent::Qr(QrPayload {
            encoded_challenge: encoded_challenge.into(),
        })
    }

    pub fn connected(message: impl Into<String>) -> Self {
        ObserverEvent::Connected(NoticePayload::new(message))
    }

    pub fn logged_out(message: impl Into<String>) -> Self {
        ObserverEvent::LoggedOut(NoticePayload::new(message))
    }

    pub fn error(message: impl Into<String>) -> Self {
        ObserverEvent::Error(NoticePayload::new(message))
    }

    pub fn send_error(message: impl Into<String>) -> Self {
        ObserverEvent::SendError(NoticePayload::new(message))
    }

    pub fn progress(current: u32, total: u32, outcome: SendOutcome) -> Self {
        ObserverEvent::MessageProgress(ProgressPayload {
            current,
            total,
            success: outcome.success,
            errors: outcome.errors,
        })
    }

    pub fn message_error(message_number: u32, error: impl Into<String>) -> Self {
        ObserverEvent::MessageError(MessageErrorPayload {
            message_number,
            error: error.into(),
        })
    }

    /// The event name as seen on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            ObserverEvent::ConnectionState(_) => "connection-state",
            ObserverEvent::Qr(_) => "qr",
            ObserverEvent::Connected(_) => "connected",
            ObserverEvent::LoggedOut(_) => "logged-out",
            ObserverEvent::Error(_) => "error",
            ObserverEvent::MessageProgress(_) => "message-progress",
            ObserverEvent::MessageError(_) => "message-error",
            ObserverEvent::SendComplete(_) => "send-complete",
            ObserverEvent::SendError(_) => "send-error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatePayload {
    pub state: ConnectionState,
    pub connected: bool,
    pub demo_mode: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrPayload {
    pub encoded_challenge: String,
}

/// Free-text notice used by `connected`, `logged-out`, `error` and `send-error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoticePayload {
    pub message: String,
}

impl NoticePayload {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressPayload {
    pub current: u32,
    pub total: u32,
    pub success: u32,
    pub errors: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageErrorPayload {
    pub message_number: u32,
    pub error: String,
}

/// What a newly attached observer is told before anything else.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectionSnapshot {
    pub state: ConnectionState,
    pub challenge: Option<String>,
    pub demo_mode: bool,
}

impl ConnectionSnapshot {
    /// The state event, followed by the challenge when one is pending.
    pub fn to_events(&self) -> Vec<ObserverEvent> {
        let mut events = vec![ObserverEvent::connection_state(self.state, self.demo_mode)];
        if let Some(challenge) = &self.challenge {
            events.push(ObserverEvent::qr(challenge.clone()));
        }
        events
    }
}
