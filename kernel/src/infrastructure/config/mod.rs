//! Configuration management for the queue dispatcher.
//!
//! Settings come from built-in defaults overridden by `RPCQUEUE__*`
//! environment variables, e.g. `RPCQUEUE__CONSUMER__MAX_IN_FLIGHT=4`.
//!
//! # Example
//!
//! ```
//! use rpcqueue_kernel::infrastructure::config::Settings;
//!
//! let settings = Settings::new().expect("Failed to load configuration");
//! assert!(settings.consumer.queue_capacity > 0);
//! ```

pub mod consumer;
pub mod telemetry;

pub use consumer::ConsumerSettings;
pub use telemetry::TelemetrySettings;

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Consume loop settings.
    #[serde(default)]
    pub consumer: ConsumerSettings,
    /// Telemetry settings.
    pub telemetry: TelemetrySettings,
}

impl Settings {
    /// Creates a new settings instance from environment variables and defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be built or deserialized.
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_environment(Environment::with_prefix("RPCQUEUE").separator("__"))
    }

    /// Builds settings from defaults overridden by `source`.
    ///
    /// # Errors
    ///
    /// Returns an error if a value has the wrong type or a validation check
    /// fails.
    pub fn from_environment(source: Environment) -> Result<Self, ConfigError> {
        let settings: Self = Config::builder()
            // Start with default values
            .set_default("telemetry.service_name", "rpcqueue")?
            // Merge in Environment variables
            .add_source(source)
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.consumer.queue_capacity == 0 {
            return Err(ConfigError::Message(
                "consumer.queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.consumer.max_in_flight == 0 {
            return Err(ConfigError::Message(
                "consumer.max_in_flight must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
