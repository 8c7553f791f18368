//! Model-serving provider settings.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::domain::foundation::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    /// API key for the provider. Required.
    #[serde(default = "default_api_key")]
    pub api_key: SecretString,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries on transient failures, on top of the initial attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl AiConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.api_key.expose_secret().trim().is_empty() {
            return Err(ValidationError::empty_field("ai.api_key"));
        }
        if self.model.trim().is_empty() {
            return Err(ValidationError::empty_field("ai.model"));
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::out_of_range(
                "ai.timeout_secs",
                1,
                i32::MAX,
                0,
            ));
        }
        Ok(())
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: default_api_key(),
            model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_api_key() -> SecretString {
    SecretString::new(String::new())
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    2
}
