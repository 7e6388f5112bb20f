//! HTTP middleware for axum.
//!
//! - `rate_limit` - per-IP request limiting

pub mod rate_limit;

pub use rate_limit::{rate_limit_middleware, RateLimiterState};
