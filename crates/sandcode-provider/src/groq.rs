//! Groq provider implementation.
//!
//! Uses OpenAI-compatible API with Groq's base URL.

use crate::{
    openai::OpenAIProvider, Completion, GenerateOptions, LanguageModel, Message, ProviderResult,
};
use async_trait::async_trait;
use std::time::Duration;

/// The Groq OpenAI-compatible base URL.
pub const GROQ_API_URL: &str = "https://api.groq.com/openai/v1";

/// Groq provider.
pub struct GroqProvider {
    inner: OpenAIProvider,
}

impl GroqProvider {
    /// Create a new Groq provider.
    pub fn new(api_key: &str, model: impl Into<String>) -> ProviderResult<Self> {
        Self::with_base_url(api_key, GROQ_API_URL, model)
    }

    /// Create a Groq provider against a custom base URL.
    pub fn with_base_url(
        api_key: &str,
        base_url: &str,
        model: impl Into<String>,
    ) -> ProviderResult<Self> {
        let inner = OpenAIProvider::compatible("groq", api_key, base_url, model)?;
        Ok(Self { inner })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.inner = self.inner.with_timeout(timeout);
        self
    }
}

#[async_trait]
impl LanguageModel for GroqProvider {
    async fn complete(
        &self,
        messages: &[Message],
        options: GenerateOptions,
    ) -> ProviderResult<Completion> {
        self.inner.complete(messages, options).await
    }

    fn provider_id(&self) -> &str {
        "groq"
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_groq_errors_are_labelled() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "bad key"})))
            .mount(&server)
            .await;

        let provider =
            GroqProvider::with_base_url("gsk-test", &server.uri(), "llama3-70b-8192").unwrap();
        assert_eq!(provider.provider_id(), "groq");
        assert_eq!(provider.model_id(), "llama3-70b-8192");

        let err = provider
            .complete(&[Message::user("hi")], GenerateOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("groq 401: "));
    }
}
