//! Connection lifecycle state.
//!
//! ```text
//! Disconnected ──challenge──▶ AwaitingScan ──opened──▶ Connected
//!      ▲                           │                      │
//!      └─────────closed────────────┴────────closed────────┘
//!
//! any ──open failure──▶ Error
//! ```
//!
//! A logged-out session is reported as an event and lands in `Disconnected`;
//! it is never retried.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::StateMachine;

/// The single process-wide connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ConnectionState {
    #[default]
    #[serde(rename = "disconnected")]
    Disconnected,

    /// A challenge has been issued and waits to be scanned.
    #[serde(rename = "qr")]
    AwaitingScan,

    #[serde(rename = "connected")]
    Connected,

    /// The last open attempt failed before a session was established.
    #[serde(rename = "error")]
    Error,
}

impl ConnectionState {
    /// Wire name used in `connection-state` events and the health endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::AwaitingScan => "qr",
            ConnectionState::Connected => "connected",
            ConnectionState::Error => "error",
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// Only `AwaitingScan` may carry a challenge payload.
    pub fn holds_challenge(&self) -> bool {
        matches!(self, ConnectionState::AwaitingScan)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StateMachine for ConnectionState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use ConnectionState::*;
        matches!(
            (self, target),
            (_, Disconnected)
                | (_, Error)
                | (Disconnected | AwaitingScan | Error, AwaitingScan)
                | (Disconnected | AwaitingScan | Error, Connected)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use ConnectionState::*;
        match self {
            Connected => vec![Disconnected, Error],
            Disconnected | AwaitingScan | Error => {
                vec![Disconnected, AwaitingScan, Connected, Error]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_disconnected() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    }

    #[test]
    fn awaiting_scan_serializes_as_qr() {
        let json = serde_json::to_string(&ConnectionState::AwaitingScan).unwrap();
        assert_eq!(json, r#""qr""#);
        assert_eq!(ConnectionState::AwaitingScan.as_str(), "qr");
    }

    #[test]
    fn happy_path_loop_is_valid() {
        let s = ConnectionState::Disconnected
            .transition_to(ConnectionState::AwaitingScan)
            .and_then(|s| s.transition_to(ConnectionState::Connected))
            .and_then(|s| s.transition_to(ConnectionState::Disconnected));
        assert_eq!(s, Ok(ConnectionState::Disconnected));
    }

    #[test]
    fn restored_credentials_connect_without_challenge() {
        assert!(ConnectionState::Disconnected.can_transition_to(&ConnectionState::Connected));
    }

    #[test]
    fn connected_cannot_reissue_challenge() {
        assert!(ConnectionState::Connected
            .transition_to(ConnectionState::AwaitingScan)
            .is_err());
    }

    #[test]
    fn challenge_may_be_refreshed() {
        assert!(ConnectionState::AwaitingScan.can_transition_to(&ConnectionState::AwaitingScan));
    }

    #[test]
    fn every_state_can_fail_or_disconnect() {
        for s in [
            ConnectionState::Disconnected,
            ConnectionState::AwaitingScan,
            ConnectionState::Connected,
            ConnectionState::Error,
        ] {
            assert!(s.can_transition_to(&ConnectionState::Disconnected));
            assert!(s.can_transition_to(&ConnectionState::Error));
            assert!(!s.is_terminal());
        }
    }

    #[test]
    fn valid_transitions_agree_with_can_transition_to() {
        for s in [
            ConnectionState::Disconnected,
            ConnectionState::AwaitingScan,
            ConnectionState::Connected,
            ConnectionState::Error,
        ] {
            for t in s.valid_transitions() {
                assert!(s.can_transition_to(&t), "{:?} -> {:?}", s, t);
            }
        }
    }
}
