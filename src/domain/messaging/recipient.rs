//! Recipient normalization.
//!
//! Raw phone numbers arrive in whatever shape the operator typed. All
//! characters other than digits and `+` are stripped, then every `+` is
//! dropped. At least ten digits must remain.

use std::fmt;

use super::errors::DispatchError;

/// Minimum number of digits for a routable number.
pub const MIN_RECIPIENT_DIGITS: usize = 10;

/// Suffix that turns a bare number into a routable user address.
pub const USER_ADDRESS_SUFFIX: &str = "@s.whatsapp.net";

/// A normalized, routable recipient.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecipientAddress {
    digits: String,
}

impl RecipientAddress {
    /// Normalizes a raw phone number string.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidRecipient`] when fewer than
    /// [`MIN_RECIPIENT_DIGITS`] digits remain after stripping.
    pub fn parse(raw: &str) -> Result<Self, DispatchError> {
        let digits: String = raw
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '+')
            .filter(|c| *c != '+')
            .collect();

        if digits.len() < MIN_RECIPIENT_DIGITS {
            return Err(DispatchError::InvalidRecipient);
        }

        Ok(Self { digits })
    }

    /// The bare digits.
    pub fn digits(&self) -> &str {
        &self.digits
    }

    /// The address handed to the session client.
    pub fn routable(&self) -> String {
        format!("{}{}", self.digits(), USER_ADDRESS_SUFFIX)
    }
}

impl fmt::Display for RecipientAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.routable())
    }
}
