//! Messaging domain - connection lifecycle, send jobs and observer events.

mod connection;
mod errors;
mod events;
mod recipient;
mod request;

pub use connection::ConnectionState;
pub use errors::{DispatchError, RangeField};
pub use events::{
    ConnectionSnapshot, ConnectionStatePayload, MessageErrorPayload, NoticePayload,
    ObserverEvent, ProgressPayload, QrPayload,
};
pub use recipient::{RecipientAddress, MIN_RECIPIENT_DIGITS, USER_ADDRESS_SUFFIX};
pub use request::{SendJob, SendOutcome, SendRequest, DELAY_MS_RANGE, MESSAGE_COUNT_RANGE};
