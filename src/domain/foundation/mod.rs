//! Foundation types shared by the domain modules.

mod errors;
mod state_machine;

pub use errors::{ErrorCode, ValidationError};
pub use state_machine::StateMachine;
