//! ChallengeRenderer port - turns a raw login challenge into something an
//! observer can display.

use thiserror::Error;

/// Rendering failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("Challenge payload is empty")]
    Empty,

    #[error("Challenge could not be encoded: {0}")]
    Encoding(String),
}

/// Port for encoding challenge payloads.
pub trait ChallengeRenderer: Send + Sync {
    /// Encodes `payload` for display, typically as an image data URL.
    fn render(&self, payload: &str) -> Result<String, RenderError>;
}

/// Renderer that forwards the payload unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughRenderer;

impl ChallengeRenderer for PassthroughRenderer {
    fn render(&self, payload: &str) -> Result<String, RenderError> {
        if payload.is_empty() {
            return Err(RenderError::Empty);
        }
        Ok(payload.to_string())
    }
}
