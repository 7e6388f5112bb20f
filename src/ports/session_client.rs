//! SessionClient port - the authenticated connection to the messaging network.
//!
//! The network protocol and credential persistence live behind this seam.
//! A connector opens one session per attempt and hands back a client plus a
//! typed event channel. The channel ends when the session is gone, so
//! subscriptions never outlive the handle they belong to.
//!
//! # Example
//!
//! ```ignore
//! let OpenedSession { client, mut events } = connector.open(&auth).await?;
//! while let Some(event) = events.recv().await {
//!     match event {
//!         SessionEvent::Challenge(payload) => show(payload),
//!         SessionEvent::Opened => break,
//!         SessionEvent::Closed(reason) => return Err(reason),
//!     }
//! }
//! client.send(&recipient, "hello").await?;
//! ```

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::messaging::RecipientAddress;

/// Status code the network uses to report an explicit logout.
pub const LOGGED_OUT_STATUS: u16 = 401;

/// Where credentials are persisted between restarts.
///
/// Passed through to the connector unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthStore {
    pub dir: PathBuf,
}

impl AuthStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

/// Why a session closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The account was logged out. Never retried.
    LoggedOut,
    /// Anything else: network loss, server restart, replaced session.
    Other {
        status_code: Option<u16>,
        detail: String,
    },
}

impl DisconnectReason {
    /// Classifies a raw close status.
    pub fn from_status(status_code: Option<u16>, detail: impl Into<String>) -> Self {
        match status_code {
            Some(LOGGED_OUT_STATUS) => DisconnectReason::LoggedOut,
            _ => DisconnectReason::Other {
                status_code,
                detail: detail.into(),
            },
        }
    }

    pub fn is_logged_out(&self) -> bool {
        matches!(self, DisconnectReason::LoggedOut)
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::LoggedOut => write!(f, "logged out"),
            DisconnectReason::Other {
                status_code: Some(code),
                detail,
            } => write!(f, "status {}: {}", code, detail),
            DisconnectReason::Other {
                status_code: None,
                detail,
            } => write!(f, "{}", detail),
        }
    }
}

/// Lifecycle events emitted by an open session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A login challenge (QR content) was issued.
    Challenge(String),
    /// The session is authenticated and ready to send.
    Opened,
    /// The session closed.
    Closed(DisconnectReason),
}

/// Errors raised by session connectors and clients.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Failed to open session: {0}")]
    Open(String),

    #[error("{0}")]
    Send(String),

    #[error("Logout failed: {0}")]
    Logout(String),

    #[error("Session is closed")]
    Closed,

    #[error("Transport error: {0}")]
    Transport(String),
}

/// A freshly opened session.
pub struct OpenedSession {
    pub client: Arc<dyn SessionClient>,
    pub events: mpsc::Receiver<SessionEvent>,
}

impl fmt::Debug for OpenedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenedSession").finish_non_exhaustive()
    }
}

/// Port for opening sessions.
#[async_trait]
pub trait SessionConnector: Send + Sync {
    /// Opens a new session using the given credential store.
    ///
    /// Failing here is fatal to the attempt; no retry is scheduled.
    async fn open(&self, auth: &AuthStore) -> Result<OpenedSession, SessionError>;
}

/// Port for an open session.
#[async_trait]
pub trait SessionClient: Send + Sync {
    /// Sends one text message.
    async fn send(&self, to: &RecipientAddress, body: &str) -> Result<(), SessionError>;

    /// Logs the account out. The session will close with `LoggedOut`.
    async fn logout(&self) -> Result<(), SessionError>;

    /// Closes the connection without logging out.
    async fn close(&self) -> Result<(), SessionError>;
}
