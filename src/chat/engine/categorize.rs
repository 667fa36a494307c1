use crate::chat::client::ProviderError;

use super::outcome::{ErrorCategory, GenerationFailure};

pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to get response from AI service.";

/// Substring rules against the provider's raw error text, first match wins.
///
/// The provider's error strings are unversioned, so this table is the one
/// place to touch when they change.
const RULES: &[(&str, ErrorCategory, &str)] = &[
    ("API key not valid", ErrorCategory::InvalidCredential, "Invalid API Key."),
    ("API_KEY_INVALID", ErrorCategory::InvalidCredential, "Invalid API Key."),
    ("API key not found", ErrorCategory::MissingCredential, "API Key not found"),
    (
        "enabled this API recently",
        ErrorCategory::PendingActivation,
        "New key needs time to activate.",
    ),
    (
        "billing account",
        ErrorCategory::BillingIssue,
        "Billing account issue with the provided API Key.",
    ),
    (
        "blocked due to safety",
        ErrorCategory::Blocked,
        "AI response blocked due to safety settings.",
    ),
    (
        "Invalid JSON payload",
        ErrorCategory::InvalidRequest,
        "Invalid request format sent to AI.",
    ),
    (
        "User location is not supported",
        ErrorCategory::UnsupportedRegion,
        "User location is not supported for this model.",
    ),
    (
        "model is overloaded",
        ErrorCategory::Overloaded,
        "The AI model is currently overloaded. Please try again in a moment.",
    ),
];

/// Maps a raw provider error to a client-facing failure.
///
/// `exhausted` marks the last error of a retry loop that ran out of
/// attempts; those always surface as [`ErrorCategory::RateLimited`] with the
/// provider's own message.
pub fn categorize(error: &ProviderError, exhausted: bool) -> GenerationFailure {
    if exhausted {
        return GenerationFailure::new(ErrorCategory::RateLimited, error.message.clone());
    }

    RULES
        .iter()
        .find(|(needle, _, _)| error.message.contains(needle))
        .map(|(_, category, message)| GenerationFailure::new(*category, *message))
        .unwrap_or_else(|| GenerationFailure::new(ErrorCategory::Unknown, GENERIC_FAILURE_MESSAGE))
}
