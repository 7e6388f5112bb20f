//! Session adapters - implementations of the SessionConnector port.

mod disabled;
mod gateway;
mod mock;

pub use disabled::{DisabledConnector, DISABLED_REASON};
pub use gateway::{GatewayClient, GatewayConfig, GatewayConnector};
pub use mock::{MockSessionClient, MockSessionConnector};
