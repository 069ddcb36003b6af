//! OpenAI chat completions provider.
//!
//! Also serves any OpenAI-compatible endpoint; see [`crate::groq`].

use crate::{
    completion::{Completion, FinishReason},
    error::ProviderError,
    message::Message,
    GenerateOptions, LanguageModel, ProviderResult, ToolDefinition,
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

/// The OpenAI API base URL.
pub const OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// OpenAI (and OpenAI-compatible) provider.
pub struct OpenAIProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    provider_id: &'static str,
    timeout: Duration,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider with API key.
    pub fn new(api_key: &str, model: impl Into<String>) -> ProviderResult<Self> {
        Self::with_base_url(api_key, OPENAI_API_URL, model)
    }

    /// Create a new OpenAI provider with a custom base URL.
    pub fn with_base_url(
        api_key: &str,
        base_url: &str,
        model: impl Into<String>,
    ) -> ProviderResult<Self> {
        Self::compatible("openai", api_key, base_url, model)
    }

    /// Create a provider for an OpenAI-compatible API reported as `provider_id`.
    pub fn compatible(
        provider_id: &'static str,
        api_key: &str,
        base_url: &str,
        model: impl Into<String>,
    ) -> ProviderResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|_| ProviderError::invalid_api_key(provider_id))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ProviderError::internal(e.to_string()))?;

        let model = model.into();
        debug!(provider = provider_id, model = %model, "Creating OpenAI-compatible provider");

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            provider_id,
            timeout: Duration::from_secs(60),
        })
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Convert tools to OpenAI format.
    fn convert_tools(tools: &[ToolDefinition]) -> Vec<Value> {
        tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.parameters
                    }
                })
            })
            .collect()
    }

    fn build_request<'a>(&'a self, messages: &'a [Message], options: &GenerateOptions) -> ChatRequest<'a> {
        let has_tools = !options.tools.is_empty();
        ChatRequest {
            model: &self.model,
            messages,
            temperature: options.temperature,
            tools: has_tools.then(|| Self::convert_tools(&options.tools)),
            tool_choice: has_tools.then_some("auto"),
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAIProvider {
    async fn complete(
        &self,
        messages: &[Message],
        options: GenerateOptions,
    ) -> ProviderResult<Completion> {
        let request = self.build_request(messages, &options);

        info!(
            provider = self.provider_id,
            model = %self.model,
            message_count = messages.len(),
            tool_count = request.tools.as_ref().map(Vec::len).unwrap_or(0),
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(provider = self.provider_id, status = %status, body = %body, "Chat completion failed");
            return Err(ProviderError::api_error(
                self.provider_id,
                status.as_u16(),
                &body,
            ));
        }

        let body: ChatResponse = response.json().await?;
        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::invalid_response("response contained no choices"))?;

        let finish_reason = choice
            .finish_reason
            .as_deref()
            .map(FinishReason::from_openai)
            .unwrap_or_default();

        debug!(
            provider = self.provider_id,
            finish_reason = ?finish_reason,
            tool_calls = choice.message.tool_calls.len(),
            has_function_call = choice.message.function_call.is_some(),
            "Chat completion received"
        );

        Ok(Completion {
            message: choice.message,
            finish_reason,
        })
    }

    fn provider_id(&self) -> &str {
        self.provider_id
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

// Request/response types

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Message,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn read_file_tool() -> ToolDefinition {
        ToolDefinition {
            name: "read_file".to_string(),
            description: "Read a file".to_string(),
            parameters: json!({"type": "object", "properties": {"path": {"type": "string"}}}),
        }
    }

    #[test]
    fn test_convert_tools() {
        let converted = OpenAIProvider::convert_tools(&[read_file_tool()]);

        assert_eq!(converted.len(), 1);
        assert_eq!(converted[0]["type"], "function");
        assert_eq!(converted[0]["function"]["name"], "read_file");
        assert_eq!(converted[0]["function"]["parameters"]["type"], "object");
    }

    #[test]
    fn test_request_without_tools_omits_tool_choice() {
        let provider = OpenAIProvider::new("sk-test", "gpt-4o").unwrap();
        let messages = vec![Message::user("hi")];
        let request = provider.build_request(&messages, &GenerateOptions::default());
        let value = serde_json::to_value(&request).unwrap();

        assert!(value.get("tools").is_none());
        assert!(value.get("tool_choice").is_none());
        assert_eq!(value["messages"][0]["role"], "user");
    }

    #[tokio::test]
    async fn test_complete_parses_tool_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o",
                "tool_choice": "auto",
                "temperature": 0.2
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "index": 0,
                    "message": {
                        "role": "assistant",
                        "content": null,
                        "tool_calls": [{
                            "id": "call_1",
                            "type": "function",
                            "function": {"name": "read_file", "arguments": "{\"path\":\"a.txt\"}"}
                        }]
                    },
                    "finish_reason": "tool_calls"
                }]
            })))
            .mount(&server)
            .await;

        let provider = OpenAIProvider::with_base_url("sk-test", &server.uri(), "gpt-4o").unwrap();
        let options = GenerateOptions {
            temperature: Some(0.2),
            tools: vec![read_file_tool()],
            ..Default::default()
        };
        let completion = provider
            .complete(&[Message::user("read a.txt")], options)
            .await
            .unwrap();

        assert_eq!(completion.finish_reason, FinishReason::ToolUse);
        assert_eq!(completion.message.role, Role::Assistant);
        assert_eq!(completion.message.tool_calls[0].id, "call_1");
        assert_eq!(completion.message.tool_calls[0].function.name, "read_file");
    }

    #[tokio::test]
    async fn test_complete_reports_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_string("tools not supported"))
            .mount(&server)
            .await;

        let provider = OpenAIProvider::with_base_url("sk-test", &server.uri(), "gpt-4o").unwrap();
        let err = provider
            .complete(&[Message::user("hi")], GenerateOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "openai 400: tools not supported");
        assert_eq!(err.status(), Some(400));
    }

    #[tokio::test]
    async fn test_complete_rejects_empty_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let provider = OpenAIProvider::with_base_url("sk-test", &server.uri(), "gpt-4o").unwrap();
        let err = provider
            .complete(&[Message::user("hi")], GenerateOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }
}
