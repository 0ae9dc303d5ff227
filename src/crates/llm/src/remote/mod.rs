//! Remote scoring providers.
//!
//! Cloud-hosted LLM APIs reached over HTTPS with an API key.
//!
//! - **OpenAI** (and OpenAI-compatible endpoints such as OpenRouter)

pub mod openai;

pub use openai::OpenAiScorer;
