use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::{
    chat::context::{ChatTurn, MessageRole},
    config::structure::LLMConfig,
};

use super::{
    error::ProviderError,
    providers::{
        Candidate, CompletionRequest, CompletionResponse, CompletionTransport, FinishReason,
        SAFETY_CATEGORIES, SAFETY_THRESHOLD, SafetyRating,
    },
};

/// `generateContent` over Gemini's REST API.
pub struct GeminiTransport {
    client: Client,
    base_url: String,
    model: String,
}

impl GeminiTransport {
    pub fn new(config: &LLMConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl CompletionTransport for GeminiTransport {
    async fn complete(
        &self,
        credential: &str,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let body = GenerateContentRequest::from(request);

        log::debug!(
            "POST {} (history: {}, max tokens: {})",
            self.endpoint(),
            request.history.len(),
            request.max_output_tokens
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", credential)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(error_from_body(status, &text));
        }

        let parsed: GenerateContentResponse = response.json().await?;

        Ok(parsed.into())
    }
}

/// Folds Gemini's error envelope into a single message so that both the
/// status line and the provider's reason codes are visible to substring
/// matching, e.g. `[400 Bad Request] API key not valid. [INVALID_ARGUMENT, API_KEY_INVALID]`.
pub fn error_from_body(status: StatusCode, body: &str) -> ProviderError {
    let head = format!(
        "[{} {}]",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown")
    );

    let message = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope { error }) => {
            let mut codes = vec![];
            codes.extend(error.status);
            codes.extend(error.details.into_iter().filter_map(|detail| detail.reason));

            match codes.is_empty() {
                true => format!("{head} {}", error.message),
                false => format!("{head} {} [{}]", error.message, codes.join(", ")),
            }
        }
        Err(_) if body.trim().is_empty() => head,
        Err(_) => format!("{head} {}", body.trim()),
    };

    ProviderError::new(Some(status.as_u16()), message)
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    safety_settings: Vec<SafetySetting>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize, Debug, Default)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Debug)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Serialize, Debug)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
}

impl Content {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
        }
    }
}

impl From<&ChatTurn> for Content {
    fn from(turn: &ChatTurn) -> Self {
        let role = match turn.role {
            MessageRole::User => "user",
            MessageRole::Assistant => "model",
        };

        Content::text(Some(role), &turn.content)
    }
}

impl From<&CompletionRequest> for GenerateContentRequest {
    fn from(request: &CompletionRequest) -> Self {
        let mut contents = request
            .history
            .iter()
            .map(Content::from)
            .collect::<Vec<_>>();
        contents.push(Content::text(Some("user"), &request.query));

        Self {
            system_instruction: request
                .system_instruction
                .as_deref()
                .map(|text| Content::text(None, text)),
            contents,
            safety_settings: SAFETY_CATEGORIES
                .into_iter()
                .map(|category| SafetySetting {
                    category,
                    threshold: SAFETY_THRESHOLD,
                })
                .collect(),
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_output_tokens,
            },
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ResponseCandidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<FinishReason>,
    #[serde(default)]
    safety_ratings: Vec<SafetyRating>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl From<GenerateContentResponse> for CompletionResponse {
    fn from(response: GenerateContentResponse) -> Self {
        let candidates = response
            .candidates
            .into_iter()
            .map(|candidate| Candidate {
                text: candidate
                    .content
                    .map(|content| {
                        content
                            .parts
                            .into_iter()
                            .filter_map(|part| part.text)
                            .collect::<String>()
                    })
                    .unwrap_or_default(),
                finish_reason: candidate.finish_reason,
                safety_ratings: candidate.safety_ratings,
            })
            .collect();

        Self {
            candidates,
            block_reason: response.prompt_feedback.and_then(|f| f.block_reason),
        }
    }
}

#[derive(Deserialize, Debug)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize, Debug)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Deserialize, Debug)]
struct ErrorDetail {
    #[serde(default)]
    reason: Option<String>,
}
