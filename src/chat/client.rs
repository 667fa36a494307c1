mod error;
mod gemini;
mod providers;

pub use error::ProviderError;
pub use gemini::GeminiTransport;
pub use providers::{
    Candidate, CompletionRequest, CompletionResponse, CompletionTransport, DEFAULT_MAX_OUTPUT_TOKENS,
    FinishReason, SAFETY_CATEGORIES, SAFETY_THRESHOLD, SafetyRating, TEMPERATURE,
};
