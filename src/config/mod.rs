//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables use the `BULK_DISPATCH` prefix
//! and `__` between nested keys.
//!
//! # Example
//!
//! ```no_run
//! use bulk_dispatch::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod error;
mod gateway;
mod messaging;
mod rate_limit;
mod server;

pub use error::{ConfigError, ValidationError};
pub use gateway::GatewayConfig;
pub use messaging::MessagingConfig;
pub use rate_limit::RateLimitConfig;
pub use server::ServerConfig;

use serde::Deserialize;

const ENV_PREFIX: &str = "BULK_DISPATCH";

/// Un-prefixed variables from older deployments and the config keys they set.
const LEGACY_OVERRIDES: [(&str, &str); 3] = [
    ("BOT_NAME", "messaging.bot_name"),
    ("DEMO_MODE", "messaging.demo_mode"),
    ("PORT", "server.port"),
];

/// Root application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub messaging: MessagingConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads variables with the `BULK_DISPATCH` prefix, `__` separated
    /// 3. Applies legacy `BOT_NAME`, `DEMO_MODE` and `PORT` on top
    ///
    /// - `BULK_DISPATCH__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `BULK_DISPATCH__MESSAGING__DEMO_MODE=true` -> `messaging.demo_mode = true`
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let legacy = LEGACY_OVERRIDES
            .iter()
            .filter_map(|(var, key)| std::env::var(var).ok().map(|value| (*key, value)))
            .collect::<Vec<_>>();

        Self::from_sources(
            config::Environment::default()
                .prefix(ENV_PREFIX)
                .separator("__"),
            &legacy,
        )
    }

    fn from_sources(
        environment: config::Environment,
        overrides: &[(&str, String)],
    ) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder().add_source(environment);
        for (key, value) in overrides {
            let value = match *key {
                // Only the literal "true" switches demo mode on.
                "messaging.demo_mode" => (value == "true").to_string(),
                _ => value.clone(),
            };
            builder = builder.set_override(*key, value)?;
        }

        let config = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.messaging.validate()?;
        self.gateway.validate(self.messaging.demo_mode)?;
        self.rate_limit.validate()?;
        Ok(())
    }

    pub fn is_demo(&self) -> bool {
        self.messaging.demo_mode
    }
}
