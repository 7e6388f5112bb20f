//! Messaging session configuration

use serde::Deserialize;
use std::time::Duration;

use crate::application::{DemoSettings, SessionSettings};
use crate::ports::AuthStore;

use super::error::ValidationError;

/// Session and send-job settings
#[derive(Debug, Clone, Deserialize)]
pub struct MessagingConfig {
    /// Sender name used in message bodies
    #[serde(default = "default_bot_name")]
    pub bot_name: String,

    /// Run without a real session
    #[serde(default)]
    pub demo_mode: bool,

    /// Credential directory handed to the connector
    #[serde(default = "default_auth_dir")]
    pub auth_dir: String,

    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,

    #[serde(default = "default_demo_challenge_delay")]
    pub demo_challenge_delay_secs: u64,

    /// Probability that a demo message fails
    #[serde(default = "default_demo_failure_rate")]
    pub demo_failure_rate: f64,

    #[serde(default = "default_demo_send_delay_cap")]
    pub demo_send_delay_cap_ms: u64,
}

impl MessagingConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.bot_name.trim().is_empty() {
            return Err(ValidationError::EmptyBotName);
        }
        if !(0.0..=1.0).contains(&self.demo_failure_rate) {
            return Err(ValidationError::InvalidFailureRate(self.demo_failure_rate));
        }
        if self.reconnect_delay_secs == 0 {
            return Err(ValidationError::InvalidReconnectDelay);
        }
        Ok(())
    }

    pub fn demo_settings(&self) -> Option<DemoSettings> {
        self.demo_mode.then(|| DemoSettings {
            challenge_delay: Duration::from_secs(self.demo_challenge_delay_secs),
            failure_rate: self.demo_failure_rate,
            send_delay_cap: Duration::from_millis(self.demo_send_delay_cap_ms),
            seed: None,
        })
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            sender_name: self.bot_name.clone(),
            auth: AuthStore::new(&self.auth_dir),
            reconnect_delay: Duration::from_secs(self.reconnect_delay_secs),
            demo: self.demo_settings(),
        }
    }
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            bot_name: default_bot_name(),
            demo_mode: false,
            auth_dir: default_auth_dir(),
            reconnect_delay_secs: default_reconnect_delay(),
            demo_challenge_delay_secs: default_demo_challenge_delay(),
            demo_failure_rate: default_demo_failure_rate(),
            demo_send_delay_cap_ms: default_demo_send_delay_cap(),
        }
    }
}

fn default_bot_name() -> String {
    "Mert Uncle Bot".to_string()
}

fn default_auth_dir() -> String {
    "auth_info_baileys".to_string()
}

fn default_reconnect_delay() -> u64 {
    5
}

fn default_demo_challenge_delay() -> u64 {
    2
}

fn default_demo_failure_rate() -> f64 {
    0.10
}

fn default_demo_send_delay_cap() -> u64 {
    500
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = MessagingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bot_name, "Mert Uncle Bot");
        assert!(config.demo_settings().is_none());
    }

    #[test]
    fn blank_bot_name_is_rejected() {
        let config = MessagingConfig {
            bot_name: "  ".into(),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::EmptyBotName));
    }

    #[test]
    fn failure_rate_must_be_a_probability() {
        let config = MessagingConfig {
            demo_failure_rate: 1.5,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidFailureRate(1.5)));
    }

    #[test]
    fn zero_reconnect_delay_is_rejected() {
        let config = MessagingConfig {
            reconnect_delay_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidReconnectDelay));
    }

    #[test]
    fn demo_mode_builds_demo_settings() {
        let config = MessagingConfig {
            demo_mode: true,
            ..Default::default()
        };
        let settings = config.session_settings();
        let demo = settings.demo.unwrap();
        assert_eq!(demo.challenge_delay, Duration::from_secs(2));
        assert_eq!(demo.send_delay_cap, Duration::from_millis(500));
        assert_eq!(settings.auth.dir.to_str(), Some("auth_info_baileys"));
        assert_eq!(settings.reconnect_delay, Duration::from_secs(5));
    }
}
