//! Error types for the domain layer.

use std::fmt;
use thiserror::Error;

/// Errors that occur during value object construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' must be between {min} and {max}, got {actual}")]
    OutOfRange {
        field: String,
        min: i64,
        max: i64,
        actual: i64,
    },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField { field: field.into() }
    }

    /// Creates an out of range validation error.
    pub fn out_of_range(field: impl Into<String>, min: i64, max: i64, actual: i64) -> Self {
        ValidationError::OutOfRange {
            field: field.into(),
            min,
            max,
            actual,
        }
    }

    /// Creates an invalid format validation error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::EmptyField { field }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::InvalidFormat { field, .. } => field,
        }
    }
}

/// Error codes organized by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Validation errors
    MissingFields,
    InvalidRecipient,
    InvalidRequestRange,

    // Guard errors
    AlreadySending,
    AlreadyReconnecting,

    // Session errors
    NotConnected,
    SendFailure,
    SessionOpenFailure,
    SessionClosedUnexpectedly,
    LogoutFailed,

    // Infrastructure errors
    RateLimited,
    InternalError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::MissingFields => "MISSING_FIELDS",
            ErrorCode::InvalidRecipient => "INVALID_RECIPIENT",
            ErrorCode::InvalidRequestRange => "INVALID_REQUEST_RANGE",
            ErrorCode::AlreadySending => "ALREADY_SENDING",
            ErrorCode::AlreadyReconnecting => "ALREADY_RECONNECTING",
            ErrorCode::NotConnected => "NOT_CONNECTED",
            ErrorCode::SendFailure => "SEND_FAILURE",
            ErrorCode::SessionOpenFailure => "SESSION_OPEN_FAILURE",
            ErrorCode::SessionClosedUnexpectedly => "SESSION_CLOSED_UNEXPECTEDLY",
            ErrorCode::LogoutFailed => "LOGOUT_FAILED",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", s)
    }
}
