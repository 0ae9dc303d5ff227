//! Scoring gateway for SOP compliance analysis.
//!
//! A [`Scorer`] evaluates one (sop, transcript) pair and returns the model's
//! compliance report together with the number of tokens the call consumed.
//! Calls are fallible and latency-variable; the gateway has no retry logic of
//! its own, callers decide what to do with a failed cell.
//!
//! # Remote provider (OpenAI-compatible)
//!
//! ```rust,ignore
//! use llm::{OpenAiScorer, RemoteLlmConfig, Scorer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RemoteLlmConfig::from_env(
//!         "OPENAI_API_KEY",
//!         "https://api.openai.com/v1",
//!         "gpt-4.1-mini",
//!     )?;
//!     let scorer = OpenAiScorer::new(config)?;
//!
//!     let score = scorer.score("Greet the caller by name.", "Agent: Hi John!").await?;
//!     println!("{} ({} tokens)", score.text, score.tokens);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod config;
pub mod error;
pub mod prompt;
pub mod remote;

pub use config::RemoteLlmConfig;
pub use error::{LlmError, Result};
pub use prompt::{ScoringPrompt, SYSTEM_PROMPT};
pub use remote::OpenAiScorer;

/// Outcome of scoring one (sop, transcript) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    /// Compliance report produced by the model.
    pub text: String,

    /// Tokens consumed by the call.
    pub tokens: u64,
}

impl Score {
    pub fn new(text: impl Into<String>, tokens: u64) -> Self {
        Self {
            text: text.into(),
            tokens,
        }
    }
}

/// External scoring function: `score(sop, transcript) -> (text, tokens)`.
#[async_trait]
pub trait Scorer: Send + Sync {
    /// Score a single pair. Implementations must not retry internally.
    async fn score(&self, sop: &str, transcript: &str) -> Result<Score>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}
