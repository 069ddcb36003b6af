//! Provider error types.

use thiserror::Error;

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors that can occur during provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP request failed (connect, timeout, body decode).
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The response body did not have the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// No API key in settings or environment. Holds the variable name.
    #[error("{0} not set in environment")]
    MissingApiKey(String),

    /// The API key cannot be used as a header value.
    #[error("Invalid API key for provider: {0}")]
    InvalidApiKey(String),

    /// Provider name not recognized.
    #[error("Unknown provider {0}")]
    UnknownProvider(String),

    /// Non-success HTTP status. `body` is already truncated.
    #[error("{provider} {status}: {body}")]
    ApiError {
        provider: String,
        status: u16,
        body: String,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal provider error.
    #[error("Provider error: {message}")]
    Internal { message: String },
}

impl ProviderError {
    /// Create a missing API key error for an environment variable.
    pub fn missing_api_key(env_var: impl Into<String>) -> Self {
        Self::MissingApiKey(env_var.into())
    }

    /// Create an invalid API key error.
    pub fn invalid_api_key(provider: impl Into<String>) -> Self {
        Self::InvalidApiKey(provider.into())
    }

    /// Create an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create an API error, truncating the body to 500 characters.
    pub fn api_error(provider: impl Into<String>, status: u16, body: &str) -> Self {
        Self::ApiError {
            provider: provider.into(),
            status,
            body: sandcode_util::truncate_chars(body, 500).to_string(),
        }
    }

    /// HTTP status of the failed request, if the provider answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::ApiError { status, .. } => Some(*status),
            ProviderError::RequestFailed(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_message_names_variable() {
        let err = ProviderError::missing_api_key("GROQ_API_KEY");
        assert_eq!(err.to_string(), "GROQ_API_KEY not set in environment");
    }

    #[test]
    fn api_error_truncates_body() {
        let body = "x".repeat(800);
        let err = ProviderError::api_error("openai", 400, &body);
        let msg = err.to_string();
        assert!(msg.starts_with("openai 400: "));
        assert_eq!(msg.len(), "openai 400: ".len() + 500);
        assert_eq!(err.status(), Some(400));
    }
}
