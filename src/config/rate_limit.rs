//! HTTP rate limit configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Per-IP fixed window
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_window")]
    pub window_secs: u64,

    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Key clients on `X-Forwarded-For` / `X-Real-IP`. Only safe behind a
    /// proxy that overwrites those headers.
    #[serde(default)]
    pub trust_proxy: bool,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.window_secs == 0 || self.max_requests == 0 {
            return Err(ValidationError::InvalidRateLimit);
        }
        Ok(())
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window(),
            max_requests: default_max_requests(),
            trust_proxy: false,
        }
    }
}

/// 15 minutes
fn default_window() -> u64 {
    900
}

fn default_max_requests() -> u32 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_allow_100_per_15_minutes() {
        let config = RateLimitConfig::default();
        assert_eq!(config.max_requests, 100);
        assert_eq!(config.window(), Duration::from_secs(15 * 60));
        assert!(!config.trust_proxy);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_limits_are_rejected() {
        let config = RateLimitConfig {
            max_requests: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidRateLimit));
    }
}
