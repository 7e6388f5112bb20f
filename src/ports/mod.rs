//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the application and the outside world. Adapters implement these ports.
//!
//! - `SessionConnector` / `SessionClient` - the messaging network session
//! - `ChallengeRenderer` - display encoding for login challenges
//! - `RateLimiter` - per-client request limiting for the HTTP surface

mod challenge_renderer;
mod rate_limiter;
mod session_client;

pub use challenge_renderer::{ChallengeRenderer, PassthroughRenderer, RenderError};
pub use rate_limiter::{
    RateLimitDenied, RateLimitError, RateLimitKey, RateLimitResult, RateLimitScope,
    RateLimitStatus, RateLimiter,
};
pub use session_client::{
    AuthStore, DisconnectReason, OpenedSession, SessionClient, SessionConnector, SessionError,
    SessionEvent, LOGGED_OUT_STATUS,
};
