//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (state machine trait, error codes)
//! - `messaging` - Connection state, send jobs, recipients and observer events

pub mod foundation;
pub mod messaging;
