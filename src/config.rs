//! Client configuration
//!
//! [`ClientConfig`] is an explicit value passed into run configuration —
//! there is no process-global default client. The API key is checked when
//! the client is built, so a missing credential fails at construction time
//! rather than on the first model call.

use std::sync::Arc;

use async_openai::{config::OpenAIConfig, Client};
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};

/// Default API endpoint
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Default model for agents that do not name one
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Connection settings for the default model client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API credential; required
    pub api_key: String,

    /// API endpoint base URL
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Model used when an agent names none
    #[serde(default = "default_model")]
    pub default_model: String,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: default_api_base(),
            default_model: default_model(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Reads configuration from the environment.
    ///
    /// `OPENAI_API_KEY` is required; `OPENAI_API_BASE` and `OPENAI_MODEL`
    /// override their defaults when present.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| AgentError::Configuration("OPENAI_API_KEY is not set".to_string()))?;

        let mut config = Self::new(api_key);

        if let Ok(base) = std::env::var("OPENAI_API_BASE") {
            config.api_base = base;
        }
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            config.default_model = model;
        }

        Ok(config)
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| AgentError::Configuration(format!("config file parse error: {}", e)))?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(AgentError::Configuration(
                "API key must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Builds the vendor client, failing fast on a missing credential.
    pub fn build_client(&self) -> Result<Arc<Client<OpenAIConfig>>> {
        self.check()?;

        let openai_config = OpenAIConfig::new()
            .with_api_key(self.api_key.clone())
            .with_api_base(self.api_base.clone());

        Ok(Arc::new(Client::with_config(openai_config)))
    }
}
