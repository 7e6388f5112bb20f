//! Rate limiting port for protecting the HTTP surface.
//!
//! Requests are counted per client IP in fixed windows. The in-memory
//! adapter is enough for a single-process deployment.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;

/// Port for rate limiting operations.
///
/// Implementations should be thread-safe and support concurrent access.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Check if request is allowed, consuming a slot if so.
    async fn check(&self, key: RateLimitKey) -> Result<RateLimitResult, RateLimitError>;
}

/// Key identifying what to rate limit.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct RateLimitKey {
    pub scope: RateLimitScope,
    /// Identifier within the scope (e.g., IP address).
    pub identifier: String,
}

/// The scope at which rate limiting is applied.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum RateLimitScope {
    /// Requests whose client address could not be determined.
    Unknown,
    /// Per-IP address rate limit.
    Ip,
}

impl RateLimitKey {
    /// Creates an IP-based rate limit key.
    pub fn ip(ip: &str) -> Self {
        Self {
            scope: RateLimitScope::Ip,
            identifier: ip.to_string(),
        }
    }

    /// Shared bucket for clients without a known address.
    pub fn unknown() -> Self {
        Self {
            scope: RateLimitScope::Unknown,
            identifier: "unknown".to_string(),
        }
    }

    /// Storage key string for this rate limit key.
    pub fn storage_key(&self) -> String {
        format!("ratelimit:{}:{}", self.scope.as_str(), self.identifier)
    }
}

impl RateLimitScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitScope::Unknown => "unknown",
            RateLimitScope::Ip => "ip",
        }
    }
}

impl fmt::Display for RateLimitScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of a rate limit check.
#[derive(Debug, Clone)]
pub enum RateLimitResult {
    Allowed(RateLimitStatus),
    Denied(RateLimitDenied),
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed(_))
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, RateLimitResult::Denied(_))
    }
}

/// Current rate limit status.
#[derive(Debug, Clone)]
pub struct RateLimitStatus {
    /// Maximum requests allowed in the window.
    pub limit: u32,
    /// Remaining requests in the current window.
    pub remaining: u32,
    /// When the current window resets.
    pub reset_at: DateTime<Utc>,
    pub window_secs: u64,
}

/// Details of a rate limit denial.
#[derive(Debug, Clone)]
pub struct RateLimitDenied {
    pub limit: u32,
    /// Seconds until the client should retry.
    pub retry_after_secs: u64,
    pub message: String,
}

/// Errors that can occur during rate limiting operations.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("rate limiter unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ip_key_has_correct_scope() {
        let key = RateLimitKey::ip("192.168.1.1");
        assert_eq!(key.scope, RateLimitScope::Ip);
        assert_eq!(key.identifier, "192.168.1.1");
    }

    #[test]
    fn storage_key_format() {
        assert_eq!(RateLimitKey::ip("10.0.0.1").storage_key(), "ratelimit:ip:10.0.0.1");
        assert_eq!(RateLimitKey::unknown().storage_key(), "ratelimit:unknown:unknown");
    }

    #[test]
    fn rate_limit_result_predicates() {
        let allowed = RateLimitResult::Allowed(RateLimitStatus {
            limit: 100,
            remaining: 50,
            reset_at: Utc::now(),
            window_secs: 900,
        });
        assert!(allowed.is_allowed());
        assert!(!allowed.is_denied());

        let denied = RateLimitResult::Denied(RateLimitDenied {
            limit: 100,
            retry_after_secs: 30,
            message: "Too many requests".to_string(),
        });
        assert!(denied.is_denied());
    }
}
