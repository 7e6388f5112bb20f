//! Rate limiter adapters.
//!
//! Implementations of the RateLimiter port.
//!
//! ```ignore
//! let limiter = InMemoryRateLimiter::new(100, Duration::from_secs(900));
//! ```

mod in_memory;

pub use in_memory::{InMemoryRateLimiter, RATE_LIMIT_MESSAGE};
