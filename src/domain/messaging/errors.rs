//! Error taxonomy for connection and dispatch operations.

use thiserror::Error;

use crate::domain::foundation::ErrorCode;

/// Which bound of a send request was violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeField {
    MessageCount,
    Delay,
}

impl RangeField {
    pub fn message(&self) -> &'static str {
        match self {
            RangeField::MessageCount => "Message count must be between 1 and 10,000",
            RangeField::Delay => "Delay must be between 1000ms (1s) and 60000ms (60s)",
        }
    }
}

/// Errors surfaced to observers as `send-error` or `error` events.
///
/// The display text is what observers see.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("WhatsApp is not connected")]
    NotConnected,

    #[error("Already sending messages")]
    AlreadySending,

    #[error("Already reconnecting")]
    AlreadyReconnecting,

    #[error("Invalid phone number format. Use format: +1234567890")]
    InvalidRecipient,

    #[error("{}", .field.message())]
    InvalidRequestRange { field: RangeField, actual: i64 },

    #[error("Missing required fields")]
    MissingFields,

    /// A single message failed; the batch continues.
    #[error("{0}")]
    SendFailure(String),

    #[error("Failed to connect to the messaging network: {0}")]
    SessionOpenFailure(String),

    #[error("Session closed unexpectedly: {0}")]
    SessionClosedUnexpectedly(String),

    #[error("Failed to logout")]
    LogoutFailed(String),

    #[error("Session manager is not running")]
    ManagerUnavailable,
}

impl DispatchError {
    pub fn code(&self) -> ErrorCode {
        match self {
            DispatchError::NotConnected => ErrorCode::NotConnected,
            DispatchError::AlreadySending => ErrorCode::AlreadySending,
            DispatchError::AlreadyReconnecting => ErrorCode::AlreadyReconnecting,
            DispatchError::InvalidRecipient => ErrorCode::InvalidRecipient,
            DispatchError::InvalidRequestRange { .. } => ErrorCode::InvalidRequestRange,
            DispatchError::MissingFields => ErrorCode::MissingFields,
            DispatchError::SendFailure(_) => ErrorCode::SendFailure,
            DispatchError::SessionOpenFailure(_) => ErrorCode::SessionOpenFailure,
            DispatchError::SessionClosedUnexpectedly(_) => ErrorCode::SessionClosedUnexpectedly,
            DispatchError::LogoutFailed(_) => ErrorCode::LogoutFailed,
            DispatchError::ManagerUnavailable => ErrorCode::InternalError,
        }
    }

    /// Guard rejections and reconnect races are expected and only logged.
    pub fn is_benign_race(&self) -> bool {
        matches!(
            self,
            DispatchError::AlreadySending | DispatchError::AlreadyReconnecting
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_errors_use_field_specific_text() {
        let count = DispatchError::InvalidRequestRange {
            field: RangeField::MessageCount,
            actual: 0,
        };
        assert_eq!(count.to_string(), "Message count must be between 1 and 10,000");

        let delay = DispatchError::InvalidRequestRange {
            field: RangeField::Delay,
            actual: 999,
        };
        assert_eq!(
            delay.to_string(),
            "Delay must be between 1000ms (1s) and 60000ms (60s)"
        );
    }

    #[test]
    fn not_connected_names_the_network() {
        assert_eq!(
            DispatchError::NotConnected.to_string(),
            "WhatsApp is not connected"
        );
    }

    #[test]
    fn logout_failure_hides_detail() {
        let err = DispatchError::LogoutFailed("socket reset".into());
        assert_eq!(err.to_string(), "Failed to logout");
    }

    #[test]
    fn codes_map_taxonomy() {
        assert_eq!(DispatchError::AlreadySending.code(), ErrorCode::AlreadySending);
        assert_eq!(DispatchError::InvalidRecipient.code(), ErrorCode::InvalidRecipient);
        assert_eq!(DispatchError::ManagerUnavailable.code(), ErrorCode::InternalError);
    }

    #[test]
    fn only_guard_races_are_benign() {
        assert!(DispatchError::AlreadySending.is_benign_race());
        assert!(DispatchError::AlreadyReconnecting.is_benign_race());
        assert!(!DispatchError::NotConnected.is_benign_race());
    }
}
