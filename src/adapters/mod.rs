//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the application to external systems:
//! - `session` - messaging-network sessions (HTTP gateway, scripted mock)
//! - `qr` - challenge rendering as QR SVG data URLs
//! - `rate_limiter` - in-memory fixed-window limiter
//! - `http` - axum router, health endpoint, rate-limit middleware
//! - `websocket` - live observer endpoint

pub mod http;
pub mod qr;
pub mod rate_limiter;
pub mod session;
pub mod websocket;

pub use qr::SvgQrRenderer;
pub use rate_limiter::InMemoryRateLimiter;
pub use session::{
    DisabledConnector, GatewayConfig, GatewayConnector, MockSessionClient, MockSessionConnector,
};
