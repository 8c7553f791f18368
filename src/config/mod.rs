//! Application configuration.
//!
//! Values come from an optional `postsmith` config file and `POSTSMITH`-
//! prefixed environment variables (`__` separates nesting, e.g.
//! `POSTSMITH__AI__API_KEY`). Every field has a default except the API key.

mod ai;
mod ingestion;
mod intent;
mod session;

pub use ai::AiConfig;
pub use ingestion::IngestionConfig;
pub use intent::IntentConfig;
pub use session::SessionConfig;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::domain::foundation::ValidationError;
use crate::domain::workflow::EngineConfig;

/// Configuration loading or validation failure.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Read(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] ValidationError),
}

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub intent: IntentConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
}

impl AppConfig {
    /// Loads configuration from file and environment, then validates it.
    pub fn load() -> Result<Self, ConfigError> {
        let raw = Config::builder()
            .add_source(File::with_name("postsmith").required(false))
            .add_source(Environment::with_prefix("POSTSMITH").separator("__"))
            .build()?;

        let app: AppConfig = raw.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    /// Validates all sections.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.engine.validate()?;
        self.session.validate()?;
        self.intent.validate()?;
        self.ai.validate()?;
        self.ingestion.validate()?;
        Ok(())
    }
}
