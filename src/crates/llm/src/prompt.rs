//! Prompt construction for compliance scoring.

/// System instruction sent with every scoring request.
pub const SYSTEM_PROMPT: &str = "You are an expert SOP compliance analyst.";

/// The two messages that make up one scoring request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringPrompt {
    pub system: String,
    pub user: String,
}

impl ScoringPrompt {
    /// Build the prompt that asks the model to judge `transcript` against `sop`.
    pub fn new(sop: &str, transcript: &str) -> Self {
        Self {
            system: SYSTEM_PROMPT.to_string(),
            user: format!(
                "Analyze the following call transcript according to this SOP.\n\nSOP:\n{}\n\nTranscript:\n{}",
                sop, transcript
            ),
        }
    }
}
