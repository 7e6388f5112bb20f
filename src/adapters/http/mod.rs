//! HTTP adapters - health endpoint, static UI and middleware.

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use handlers::{health, HealthResponse, HealthState};
pub use middleware::RateLimiterState;
pub use routes::app_router;
