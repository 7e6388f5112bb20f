//! Connector for deployments without a session backend.
//!
//! Demo mode never opens a session; this keeps the wiring honest if
//! something tries.

use async_trait::async_trait;

use crate::ports::{AuthStore, OpenedSession, SessionConnector, SessionError};

pub const DISABLED_REASON: &str = "no session backend configured (demo mode)";

#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledConnector;

#[async_trait]
impl SessionConnector for DisabledConnector {
    async fn open(&self, auth: &AuthStore) -> Result<OpenedSession, SessionError> {
        tracing::warn!(auth_dir = %auth.dir.display(), "Session open attempted without a backend");
        Err(SessionError::Open(DISABLED_REASON.to_string()))
    }
}
