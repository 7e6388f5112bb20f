//! Application layer - orchestration of the messaging session.
//!
//! The session manager owns connection state and drives the connection
//! controller. Send jobs run on the message dispatcher, or the demo
//! simulator when no real session is configured. Everything observers see
//! goes out through the broadcast hub.

mod broadcast_hub;
mod connection_controller;
mod demo_simulator;
mod dispatch_guard;
mod message_dispatcher;
mod session_manager;

pub use broadcast_hub::{BroadcastHub, Subscription, DEFAULT_HUB_CAPACITY};
pub use connection_controller::{
    ConnectionController, ConnectionSettings, CONNECTED_MESSAGE, DEMO_CONNECTED_MESSAGE,
    LOGGED_OUT_MESSAGE, OPEN_FAILED_MESSAGE, RENDER_FAILED_MESSAGE,
};
pub use demo_simulator::{DemoSettings, DemoSimulator, DEMO_CHALLENGE, DEMO_FAILURE};
pub use dispatch_guard::{DispatchGuard, GuardFlag, GuardPermit};
pub use message_dispatcher::MessageDispatcher;
pub use session_manager::{SessionHandle, SessionManager, SessionSettings, SessionStatus};
