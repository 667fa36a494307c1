use thiserror::Error;

/// A raw failure from the provider, before categorization.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ProviderError {
    /// HTTP status, absent when the request never got a response.
    pub status: Option<u16>,
    pub message: String,
}

impl ProviderError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Rate limiting and temporary unavailability, however the provider
    /// phrases it. Only these are worth retrying.
    pub fn is_transient(&self) -> bool {
        if matches!(self.status, Some(429) | Some(503)) {
            return true;
        }

        let message = &self.message;
        let lowered = message.to_lowercase();

        message.contains("429")
            || message.contains("503")
            || message.contains("RESOURCE_EXHAUSTED")
            || message.contains("UNAVAILABLE")
            || lowered.contains("too many requests")
            || lowered.contains("quota")
            || lowered.contains("overloaded")
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        Self {
            status: error.status().map(|status| status.as_u16()),
            message: error.to_string(),
        }
    }
}
