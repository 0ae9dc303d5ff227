//! OpenAI scorer implementation.
//!
//! Sends one chat-completion request per (sop, transcript) pair and maps the
//! first choice and the usage block onto a [`Score`].
//!
//! # Example
//!
//! ```rust,ignore
//! use llm::{OpenAiScorer, RemoteLlmConfig, Scorer};
//!
//! let config = RemoteLlmConfig::from_env("OPENAI_API_KEY", "https://api.openai.com/v1", "gpt-4.1-mini")?;
//! let scorer = OpenAiScorer::new(config)?;
//! let score = scorer.score(sop, transcript).await?;
//! ```

use crate::config::RemoteLlmConfig;
use crate::error::{LlmError, Result};
use crate::prompt::ScoringPrompt;
use crate::{Score, Scorer};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// OpenAI chat-completions scorer.
#[derive(Clone)]
pub struct OpenAiScorer {
    config: RemoteLlmConfig,
    client: Client,
}

impl OpenAiScorer {
    /// Create a new scorer with the given configuration.
    pub fn new(config: RemoteLlmConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    /// Access the configuration.
    pub fn config(&self) -> &RemoteLlmConfig {
        &self.config
    }

    fn build_request(&self, prompt: ScoringPrompt) -> OpenAiRequest {
        OpenAiRequest {
            model: self.config.model.clone(),
            messages: vec![
                OpenAiMessage {
                    role: "system".to_string(),
                    content: Some(prompt.system),
                },
                OpenAiMessage {
                    role: "user".to_string(),
                    content: Some(prompt.user),
                },
            ],
            temperature: Some(self.config.temperature),
            stream: false,
        }
    }

    fn convert_response(resp: OpenAiResponse) -> Score {
        let text = resp
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        let tokens = resp.usage.map(|u| u.total_tokens).unwrap_or(0);

        Score::new(text, tokens)
    }

    fn classify_status(status: StatusCode, body: String) -> LlmError {
        match status.as_u16() {
            401 | 403 => LlmError::AuthenticationError(body),
            408 => LlmError::Timeout(body),
            429 => LlmError::RateLimitExceeded(body),
            500..=599 => LlmError::ServiceUnavailable(format!("OpenAI API error {}: {}", status, body)),
            _ => LlmError::ProviderError(format!("OpenAI API error {}: {}", status, body)),
        }
    }
}

#[async_trait]
impl Scorer for OpenAiScorer {
    async fn score(&self, sop: &str, transcript: &str) -> Result<Score> {
        let url = self.config.completions_url();
        let req_body = self.build_request(ScoringPrompt::new(sop, transcript));

        let mut req = self
            .client
            .post(&url)
            .json(&req_body)
            .header("Authorization", format!("Bearer {}", self.config.api_key));

        if let Some(org) = &self.config.organization {
            req = req.header("OpenAI-Organization", org);
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(e.to_string())
            } else {
                LlmError::HttpError(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, error_text));
        }

        let openai_resp: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        debug!(model = %openai_resp.model, "Received completion");
        Ok(Self::convert_response(openai_resp))
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

// OpenAI API types
#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    total_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn scorer() -> OpenAiScorer {
        let config = RemoteLlmConfig::new("test-key", "https://api.openai.com/v1", "gpt-4.1-mini");
        OpenAiScorer::new(config).unwrap()
    }

    #[test]
    fn test_scorer_creation_with_custom_timeout() {
        let config = RemoteLlmConfig::new("test-key", "https://api.openai.com/v1", "gpt-4.1-mini")
            .with_timeout(Duration::from_secs(10));
        let scorer = OpenAiScorer::new(config).unwrap();
        assert_eq!(scorer.config().timeout, Duration::from_secs(10));
        assert_eq!(scorer.model(), "gpt-4.1-mini");
    }

    #[test]
    fn test_request_body_shape() {
        let body = scorer().build_request(ScoringPrompt::new("SOP text", "Transcript text"));
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["model"], "gpt-4.1-mini");
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert!(json["messages"][1]["content"]
            .as_str()
            .unwrap()
            .contains("SOP:\nSOP text"));
        assert!((json["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_response_conversion_basic() {
        let resp: OpenAiResponse = serde_json::from_str(
            r#"{
                "id": "chatcmpl-123",
                "object": "chat.completion",
                "created": 1234567890,
                "model": "gpt-4.1-mini",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "Compliant."}, "finish_reason": "stop"}],
                "usage": {"prompt_tokens": 7, "completion_tokens": 3, "total_tokens": 10}
            }"#,
        )
        .unwrap();

        let score = OpenAiScorer::convert_response(resp);
        assert_eq!(score, Score::new("Compliant.", 10));
    }

    #[test]
    fn test_response_conversion_missing_fields_default() {
        let resp: OpenAiResponse =
            serde_json::from_str(r#"{"model": "gpt-4.1-mini", "choices": []}"#).unwrap();

        let score = OpenAiScorer::convert_response(resp);
        assert_eq!(score, Score::new("", 0));
    }

    #[test]
    fn test_status_classification() {
        let auth = OpenAiScorer::classify_status(StatusCode::UNAUTHORIZED, "bad key".into());
        assert!(auth.is_auth_error());

        let limited = OpenAiScorer::classify_status(StatusCode::TOO_MANY_REQUESTS, "".into());
        assert!(matches!(limited, LlmError::RateLimitExceeded(_)));
        assert!(limited.is_retryable());

        let outage = OpenAiScorer::classify_status(StatusCode::BAD_GATEWAY, "".into());
        assert!(outage.is_retryable());

        let bad = OpenAiScorer::classify_status(StatusCode::BAD_REQUEST, "context too long".into());
        assert!(matches!(bad, LlmError::ProviderError(_)));
        assert!(!bad.is_retryable());
    }
}
