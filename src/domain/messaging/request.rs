//! Send requests, validated jobs and their outcomes.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::time::Duration;

use super::errors::{DispatchError, RangeField};
use super::recipient::RecipientAddress;

/// Allowed number of messages per job.
pub const MESSAGE_COUNT_RANGE: RangeInclusive<i64> = 1..=10_000;

/// Allowed pause between messages, in milliseconds.
pub const DELAY_MS_RANGE: RangeInclusive<i64> = 1_000..=60_000;

/// A raw request submitted by an observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    pub recipient: String,
    pub message_count: i64,
    pub delay_ms: i64,
}

impl SendRequest {
    pub fn new(recipient: impl Into<String>, message_count: i64, delay_ms: i64) -> Self {
        Self {
            recipient: recipient.into(),
            message_count,
            delay_ms,
        }
    }

    /// Checks the numeric bounds. Both ends are inclusive.
    pub fn validate_ranges(&self) -> Result<(), DispatchError> {
        if !MESSAGE_COUNT_RANGE.contains(&self.message_count) {
            return Err(DispatchError::InvalidRequestRange {
                field: RangeField::MessageCount,
                actual: self.message_count,
            });
        }
        if !DELAY_MS_RANGE.contains(&self.delay_ms) {
            return Err(DispatchError::InvalidRequestRange {
                field: RangeField::Delay,
                actual: self.delay_ms,
            });
        }
        Ok(())
    }

    /// Validates ranges and normalizes the recipient.
    pub fn into_job(self) -> Result<SendJob, DispatchError> {
        self.validate_ranges()?;
        let recipient = RecipientAddress::parse(&self.recipient)?;

        // Both values were range-checked above.
        Ok(SendJob {
            recipient,
            total: self.message_count as u32,
            delay: Duration::from_millis(self.delay_ms as u64),
        })
    }
}

/// An accepted request, consumed one message at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendJob {
    recipient: RecipientAddress,
    total: u32,
    delay: Duration,
}

impl SendJob {
    pub fn recipient(&self) -> &RecipientAddress {
        &self.recipient
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Sequence numbers in send order, starting at 1.
    pub fn indices(&self) -> RangeInclusive<u32> {
        1..=self.total
    }

    /// True when `index` is the final message of the job.
    pub fn is_last(&self, index: u32) -> bool {
        index >= self.total
    }

    /// The text body sent for message `index`.
    pub fn body(&self, index: u32, sender_name: &str) -> String {
        format!("Message {} of {} from {}", index, self.total, sender_name)
    }
}

/// Aggregate result of one job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendOutcome {
    pub success: u32,
    pub errors: u32,
}

impl SendOutcome {
    pub fn record_success(&mut self) {
        self.success += 1;
    }

    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    /// Messages attempted so far.
    pub fn attempted(&self) -> u32 {
        self.success + self.errors
    }
}
