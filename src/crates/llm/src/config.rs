//! Configuration for remote scoring providers.

use crate::error::{LlmError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for an OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteLlmConfig {
    /// API key for authentication.
    pub api_key: String,

    /// Base URL for the API.
    ///
    /// Examples:
    /// - OpenAI: "https://api.openai.com/v1"
    /// - OpenRouter: "https://openrouter.ai/api/v1"
    pub base_url: String,

    /// Model name/identifier.
    pub model: String,

    /// Sampling temperature sent with every request.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout duration. This is the only time budget applied to a
    /// scoring call.
    #[serde(default = "default_timeout")]
    pub timeout: Duration,

    /// Organization ID (optional, for providers that support it).
    pub organization: Option<String>,
}

impl RemoteLlmConfig {
    /// Create a new remote LLM configuration.
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
            temperature: default_temperature(),
            timeout: default_timeout(),
            organization: None,
        }
    }

    /// Create configuration reading the API key from an environment variable.
    pub fn from_env(
        env_var: &str,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let api_key = std::env::var(env_var)
            .map_err(|_| LlmError::ApiKeyNotFound(format!("Environment variable: {}", env_var)))?;

        Ok(Self::new(api_key, base_url, model))
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the organization ID.
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    /// Chat-completions URL derived from the base URL.
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_temperature() -> f32 {
    0.2
}
