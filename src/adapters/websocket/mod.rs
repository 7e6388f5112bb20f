//! WebSocket adapter for live observers.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      SessionManager                          │
//! │   connection state machine │ dispatch loop │ demo simulator  │
//! └──────────────────────────────────────────────────────────────┘
//!                               │ publishes
//!                               ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       BroadcastHub                           │
//! │   snapshot on subscribe + broadcast channel                  │
//! └──────────────────────────────────────────────────────────────┘
//!            │ every observer            ▲ commands
//!            ▼                           │
//! ┌──────────────────────────────────────────────────────────────┐
//! │   ws handler (one per observer)                              │
//! │   hub events + direct replies ──▶ socket ──▶ client commands │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`messages`] - client frame protocol
//! - [`handler`] - axum upgrade handler and per-connection loop

pub mod handler;
pub mod messages;

pub use handler::{respond, websocket_router, ws_handler, WebSocketState, LOGOUT_REPLY};
pub use messages::{ClientId, ClientMessage, SendMessagesPayload};
