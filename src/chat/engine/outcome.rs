use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chat::client::FinishReason;

/// Stable, client-facing failure categories.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    InvalidRequest,
    MissingCredential,
    InvalidCredential,
    PendingActivation,
    BillingIssue,
    Blocked,
    UnsupportedRegion,
    Overloaded,
    RateLimited,
    Unknown,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "InvalidRequest",
            Self::MissingCredential => "MissingCredential",
            Self::InvalidCredential => "InvalidCredential",
            Self::PendingActivation => "PendingActivation",
            Self::BillingIssue => "BillingIssue",
            Self::Blocked => "Blocked",
            Self::UnsupportedRegion => "UnsupportedRegion",
            Self::Overloaded => "Overloaded",
            Self::RateLimited => "RateLimited",
            Self::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A categorized failure: the category drives programmatic handling, the
/// message is for display.
#[derive(Error, Serialize, Debug, Clone, PartialEq)]
#[error("{category}: {message}")]
pub struct GenerationFailure {
    pub category: ErrorCategory,
    pub message: String,
}

impl GenerationFailure {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }
}

/// Generated text together with how it ended.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    pub finish_reason: FinishReason,
    /// Number of provider calls it took, retries included.
    pub attempts: u32,
}

impl Generation {
    /// Stopped at the output-length cap; `text` is partial.
    pub fn is_truncated(&self) -> bool {
        self.finish_reason == FinishReason::MaxTokens
    }
}

pub type GenerationResult = Result<Generation, GenerationFailure>;
