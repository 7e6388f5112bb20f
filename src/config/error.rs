//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("Bot name must not be empty")]
    EmptyBotName,

    #[error("Demo failure rate must be between 0 and 1, got {0}")]
    InvalidFailureRate(f64),

    #[error("Reconnect delay must be at least one second")]
    InvalidReconnectDelay,

    #[error("Gateway timeout must be at least one second")]
    InvalidGatewayTimeout,

    #[error("Rate limit window and maximum must be positive")]
    InvalidRateLimit,
}
