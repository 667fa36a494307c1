use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct GatewayConfigTOML {
    #[serde(default)]
    pub config: GatewayConfigInner,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct GatewayConfigInner {
    pub server: ServerConfig,
    pub llm: LLMConfig,
    pub retry: RetryConfig,
    pub tutor: TutorConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on a whole chat turn, retries included.
    pub chat_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 2002,
            chat_timeout_secs: 180,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LLMConfig {
    /// Server-wide default; callers may still send their own key.
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub max_output_tokens: u32,
    pub request_timeout_secs: u64,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-flash-latest".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            max_output_tokens: 8192,
            request_timeout_secs: 60,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Clamped to 1..=5.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_jitter_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 2000,
            max_jitter_ms: 1000,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TutorConfig {
    pub system_prompt: String,
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            system_prompt: "You are a Socratic tutor. Never hand the student a final answer. \
Guide them with one focused question at a time, build on what they already know, \
and point out contradictions in their reasoning so they can resolve them on their own. \
When they reach a correct conclusion, ask them to explain why it holds."
                .to_string(),
        }
    }
}
