use std::fmt::Display;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::chat::context::ChatTurn;

use super::error::ProviderError;

/// Sampling temperature for every tutoring call.
pub const TEMPERATURE: f64 = 0.7;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 8192;

/// Harm categories the provider is asked to filter, each at `BLOCK_ONLY_HIGH`.
pub const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];
pub const SAFETY_THRESHOLD: &str = "BLOCK_ONLY_HIGH";

/// The outbound chat-completion call.
///
/// Implementations perform exactly one request per invocation; retrying is
/// the gateway's job.
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    async fn complete(
        &self,
        credential: &str,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_instruction: Option<String>,
    pub history: Vec<ChatTurn>,
    pub query: String,
    pub temperature: f64,
    pub max_output_tokens: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionResponse {
    pub candidates: Vec<Candidate>,
    /// Set when the prompt itself was rejected and no candidate was produced.
    pub block_reason: Option<String>,
}

impl CompletionResponse {
    pub fn text(text: impl Into<String>, finish_reason: FinishReason) -> Self {
        Self {
            candidates: vec![Candidate {
                text: text.into(),
                finish_reason: Some(finish_reason),
                safety_ratings: vec![],
            }],
            block_reason: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidate {
    pub text: String,
    pub finish_reason: Option<FinishReason>,
    pub safety_ratings: Vec<SafetyRating>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SafetyRating {
    pub category: String,
    #[serde(default)]
    pub probability: Option<String>,
    #[serde(default)]
    pub blocked: bool,
}

/// Why the provider stopped generating.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum FinishReason {
    Stop,
    MaxTokens,
    Safety,
    Recitation,
    Other(String),
}

impl FinishReason {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Stop => "STOP",
            Self::MaxTokens => "MAX_TOKENS",
            Self::Safety => "SAFETY",
            Self::Recitation => "RECITATION",
            Self::Other(reason) => reason,
        }
    }
}

impl From<String> for FinishReason {
    fn from(value: String) -> Self {
        match value.as_str() {
            "STOP" => Self::Stop,
            "MAX_TOKENS" => Self::MaxTokens,
            "SAFETY" => Self::Safety,
            "RECITATION" => Self::Recitation,
            _ => Self::Other(value),
        }
    }
}

impl From<FinishReason> for String {
    fn from(value: FinishReason) -> Self {
        value.as_str().to_string()
    }
}

impl Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
