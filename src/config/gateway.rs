//! Session gateway configuration

use secrecy::Secret;
use serde::Deserialize;
use std::time::Duration;

use crate::adapters::session::GatewayConfig as GatewayClientConfig;

use super::error::ValidationError;

/// Where the session gateway lives and how to reach it
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Base URL, e.g. `http://localhost:8081`
    pub url: Option<String>,

    /// Bearer token sent on every call
    #[serde(default)]
    pub api_token: Option<Secret<String>>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl GatewayConfig {
    /// `demo_mode` lifts the URL requirement.
    pub fn validate(&self, demo_mode: bool) -> Result<(), ValidationError> {
        let has_url = self.url.as_deref().is_some_and(|url| !url.trim().is_empty());
        if !demo_mode && !has_url {
            return Err(ValidationError::MissingRequired("gateway.url"));
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidGatewayTimeout);
        }
        Ok(())
    }

    /// Client settings, or `None` when no URL is configured.
    pub fn client_config(&self) -> Option<GatewayClientConfig> {
        let url = self.url.as_deref().filter(|url| !url.trim().is_empty())?;
        let config =
            GatewayClientConfig::new(url).with_timeout(Duration::from_secs(self.timeout_secs));
        Some(match &self.api_token {
            Some(token) => config.with_api_token(token.clone()),
            None => config,
        })
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_token: None,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}
