use std::sync::Arc;

use serde_json::Value;

use crate::chat::{
    client::{
        CompletionRequest, CompletionResponse, CompletionTransport, DEFAULT_MAX_OUTPUT_TOKENS,
        FinishReason, TEMPERATURE,
    },
    context::normalize_history,
};

use super::{
    categorize::categorize,
    outcome::{ErrorCategory, Generation, GenerationFailure, GenerationResult},
    retry::{Clock, RetryOutcome, RetryPolicy, TokioClock},
};

/// Per-call overrides.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub max_output_tokens: Option<u32>,
    /// Takes precedence over the gateway's default credential.
    pub credential: Option<String>,
}

/// Forwards a conversation turn to the provider, retrying transient
/// failures and translating everything else into a [`GenerationFailure`].
///
/// Holds no per-call state, so one instance serves any number of concurrent
/// conversations.
pub struct CompletionGateway {
    transport: Arc<dyn CompletionTransport>,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
    default_credential: Option<String>,
    default_max_output_tokens: u32,
}

impl CompletionGateway {
    pub fn new(
        transport: Arc<dyn CompletionTransport>,
        policy: RetryPolicy,
        default_credential: Option<String>,
    ) -> Self {
        Self {
            transport,
            clock: Arc::new(TokioClock),
            policy,
            default_credential: default_credential.filter(|key| !key.trim().is_empty()),
            default_max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.default_max_output_tokens = max_output_tokens;
        self
    }

    pub async fn generate(
        &self,
        history: &[Value],
        query: &str,
        system_prompt: Option<&str>,
        options: GenerateOptions,
    ) -> GenerationResult {
        if query.trim().is_empty() {
            log::warn!("rejecting generation request with an empty query");
            return Err(GenerationFailure::new(
                ErrorCategory::InvalidRequest,
                "Query must be a non-empty string.",
            ));
        }

        let credential = options
            .credential
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.default_credential.clone())
            .ok_or_else(|| {
                log::error!("no API key available: none given for this call and no default configured");
                GenerationFailure::new(
                    ErrorCategory::MissingCredential,
                    "API Key is missing. Please configure it.",
                )
            })?;

        let request = CompletionRequest {
            system_instruction: system_prompt
                .map(str::trim)
                .filter(|prompt| !prompt.is_empty())
                .map(str::to_string),
            history: normalize_history(history),
            query: query.to_string(),
            temperature: TEMPERATURE,
            max_output_tokens: options
                .max_output_tokens
                .unwrap_or(self.default_max_output_tokens),
        };

        log::info!(
            "sending message to provider (history: {}, system prompt: {}, max tokens: {})",
            request.history.len(),
            request.system_instruction.is_some(),
            request.max_output_tokens
        );

        let outcome = self
            .policy
            .run(self.clock.as_ref(), |_| {
                self.transport.complete(&credential, &request)
            })
            .await;

        match outcome {
            RetryOutcome::Succeeded { value, attempts } => validate(value, attempts),
            RetryOutcome::Failed {
                error, exhausted, ..
            } => {
                let failure = categorize(&error, exhausted);
                log::warn!("generation failed as {}: {}", failure.category, failure.message);
                Err(failure)
            }
        }
    }
}

/// Accepts a normal stop or the length cap; anything else counts as blocked.
fn validate(response: CompletionResponse, attempts: u32) -> GenerationResult {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response.block_reason.unwrap_or_else(|| "Unknown".to_string());
        log::warn!("provider returned no candidates (block reason: {reason})");

        return Err(GenerationFailure::new(
            ErrorCategory::Blocked,
            format!("AI response generation failed or was blocked. Reason: {reason}."),
        ));
    };

    match candidate.finish_reason {
        Some(finish_reason @ (FinishReason::Stop | FinishReason::MaxTokens)) => {
            if finish_reason == FinishReason::MaxTokens {
                log::warn!(
                    "provider response was truncated at the output token limit ({} chars returned)",
                    candidate.text.len()
                );
            }

            Ok(Generation {
                text: candidate.text,
                finish_reason,
                attempts,
            })
        }
        reason => {
            let reason = reason
                .map(|reason| reason.to_string())
                .unwrap_or_else(|| "Unknown".to_string());

            let flagged = candidate
                .safety_ratings
                .iter()
                .filter(|rating| rating.blocked)
                .map(|rating| rating.category.as_str())
                .collect::<Vec<_>>();

            log::warn!("provider response was blocked (finish reason: {reason}, flagged: {flagged:?})");

            let mut message = format!("AI response generation failed or was blocked. Reason: {reason}.");
            if !flagged.is_empty() {
                message.push_str(&format!(" Blocked Categories: {}.", flagged.join(", ")));
            }

            Err(GenerationFailure::new(ErrorCategory::Blocked, message))
        }
    }
}
