//! Anthropic (Claude) provider implementation.
//!
//! Requests go to the messages API. The conversation is converted from the
//! OpenAI shape on the way out and the reply is converted back, so callers
//! never see Anthropic content blocks.

use crate::{
    completion::{Completion, FinishReason},
    error::ProviderError,
    message::{Message, Role, ToolCall},
    GenerateOptions, LanguageModel, ProviderResult, ToolDefinition,
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

/// The Anthropic API base URL.
pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com";

/// The Anthropic API version.
const ANTHROPIC_VERSION: &str = "2023-06-01";

const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Anthropic (Claude) provider.
pub struct AnthropicProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider with API key.
    pub fn new(api_key: &str, model: impl Into<String>) -> ProviderResult<Self> {
        Self::with_base_url(api_key, ANTHROPIC_API_URL, model)
    }

    /// Create a new Anthropic provider with a custom base URL.
    pub fn with_base_url(
        api_key: &str,
        base_url: &str,
        model: impl Into<String>,
    ) -> ProviderResult<Self> {
        let mut headers = HeaderMap::new();

        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key)
                .map_err(|_| ProviderError::invalid_api_key("anthropic"))?,
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let model = model.into();
        debug!(model = %model, "Creating Anthropic provider");

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ProviderError::internal(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            timeout: Duration::from_secs(60),
        })
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Convert messages to Anthropic format.
    ///
    /// System messages are folded into the `system` field. Consecutive
    /// messages that map to the same role are merged, since the API requires
    /// alternating turns and all `tool_result` blocks for one assistant turn
    /// in a single user message.
    fn convert_messages(messages: &[Message]) -> (Option<String>, Vec<AnthropicMessage>) {
        let mut system: Option<String> = None;
        let mut converted: Vec<AnthropicMessage> = Vec::new();

        for msg in messages {
            let (role, blocks) = match msg.role {
                Role::System => {
                    let text = msg.text();
                    system = Some(match system {
                        None => text.to_string(),
                        Some(existing) => format!("{existing}\n\n{text}"),
                    });
                    continue;
                }
                Role::User => ("user", text_blocks(msg.text())),
                Role::Assistant => ("assistant", assistant_blocks(msg)),
                Role::Tool => (
                    "user",
                    vec![json!({
                        "type": "tool_result",
                        "tool_use_id": msg.tool_call_id.clone().unwrap_or_default(),
                        "content": msg.text()
                    })],
                ),
                Role::Function => {
                    let name = msg.name.as_deref().unwrap_or("function");
                    ("user", text_blocks(&format!("{name} result: {}", msg.text())))
                }
            };

            if blocks.is_empty() {
                continue;
            }

            match converted.last_mut() {
                Some(last) if last.role == role => last.content.extend(blocks),
                _ => converted.push(AnthropicMessage {
                    role: role.to_string(),
                    content: blocks,
                }),
            }
        }

        (system, converted)
    }

    /// Convert tool definitions to Anthropic format.
    fn convert_tools(tools: &[ToolDefinition]) -> Vec<Value> {
        tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "input_schema": tool.parameters
                })
            })
            .collect()
    }

    /// Convert a messages API reply back to an OpenAI-shaped assistant message.
    fn convert_response(response: AnthropicResponse) -> Completion {
        let mut text = String::new();
        let mut tool_calls = Vec::new();

        for block in response.content {
            match block {
                ResponseBlock::Text { text: part } => text.push_str(&part),
                ResponseBlock::ToolUse { id, name, input } => {
                    tool_calls.push(ToolCall::new(id, name, input.to_string()));
                }
                ResponseBlock::Other => {}
            }
        }

        let content = (!text.is_empty()).then_some(text);
        let finish_reason = response
            .stop_reason
            .as_deref()
            .map(FinishReason::from_anthropic)
            .unwrap_or_default();

        Completion {
            message: Message::assistant_tool_calls(content, tool_calls),
            finish_reason,
        }
    }
}

fn text_blocks(text: &str) -> Vec<Value> {
    if text.is_empty() {
        Vec::new()
    } else {
        vec![json!({ "type": "text", "text": text })]
    }
}

fn assistant_blocks(msg: &Message) -> Vec<Value> {
    let mut blocks = text_blocks(msg.text());

    for call in &msg.tool_calls {
        let input: Value = serde_json::from_str(&call.function.arguments)
            .ok()
            .filter(Value::is_object)
            .unwrap_or_else(|| json!({}));
        blocks.push(json!({
            "type": "tool_use",
            "id": call.id,
            "name": call.function.name,
            "input": input
        }));
    }

    // A legacy function call has no tool_use id to pair with, so it is
    // replayed as text.
    if let Some(call) = &msg.function_call {
        blocks.extend(text_blocks(&format!(
            "Calling {} with {}",
            call.name, call.arguments
        )));
    }

    blocks
}

#[async_trait]
impl LanguageModel for AnthropicProvider {
    async fn complete(
        &self,
        messages: &[Message],
        options: GenerateOptions,
    ) -> ProviderResult<Completion> {
        let (system, converted_messages) = Self::convert_messages(messages);

        let request = AnthropicRequest {
            model: &self.model,
            messages: converted_messages,
            max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system,
            temperature: options.temperature,
            tools: if options.tools.is_empty() {
                None
            } else {
                Some(Self::convert_tools(&options.tools))
            },
        };

        info!(
            model = %self.model,
            message_count = request.messages.len(),
            tool_count = request.tools.as_ref().map(Vec::len).unwrap_or(0),
            "Sending Anthropic API request"
        );

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Anthropic request failed");
            return Err(ProviderError::api_error("anthropic", status.as_u16(), &body));
        }

        let body: AnthropicResponse = response.json().await?;
        Ok(Self::convert_response(body))
    }

    fn provider_id(&self) -> &str {
        "anthropic"
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

// Request/response types

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_convert_messages() {
        let messages = vec![
            Message::system("You are helpful"),
            Message::system("Be brief"),
            Message::user("Hello"),
            Message::assistant("Hi there!"),
        ];

        let (system, converted) = AnthropicProvider::convert_messages(&messages);

        assert_eq!(system, Some("You are helpful\n\nBe brief".to_string()));
        assert_eq!(converted.len(), 2);
        assert_eq!(converted[0].role, "user");
        assert_eq!(converted[1].role, "assistant");
    }

    #[test]
    fn test_convert_tool_round_trip_messages() {
        let messages = vec![
            Message::user("make two files"),
            Message::assistant_tool_calls(
                None,
                vec![
                    ToolCall::new("t1", "write_file", r#"{"path":"a","content":"1"}"#),
                    ToolCall::new("t2", "write_file", "not json"),
                ],
            ),
            Message::tool_result("t1", r#"{"result":"written"}"#),
            Message::tool_result("t2", r#"{"result":"written"}"#),
            Message::function_result("list_files", r#"{"files":[]}"#),
        ];

        let (_, converted) = AnthropicProvider::convert_messages(&messages);

        assert_eq!(converted.len(), 3);
        let assistant = &converted[1];
        assert_eq!(assistant.content.len(), 2);
        assert_eq!(assistant.content[0]["type"], "tool_use");
        assert_eq!(assistant.content[0]["input"]["path"], "a");
        assert_eq!(assistant.content[1]["input"], json!({}));

        let results = &converted[2];
        assert_eq!(results.role, "user");
        assert_eq!(results.content.len(), 3);
        assert_eq!(results.content[0]["type"], "tool_result");
        assert_eq!(results.content[1]["tool_use_id"], "t2");
        assert_eq!(results.content[2]["type"], "text");
    }

    #[test]
    fn test_convert_tools() {
        let tools = vec![ToolDefinition {
            name: "mkdir".to_string(),
            description: "Create a directory".to_string(),
            parameters: json!({"type": "object"}),
        }];
        let converted = AnthropicProvider::convert_tools(&tools);
        assert_eq!(converted[0]["name"], "mkdir");
        assert_eq!(converted[0]["input_schema"]["type"], "object");
    }

    #[tokio::test]
    async fn test_complete_converts_tool_use() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "ak-test"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "msg_1",
                "type": "message",
                "role": "assistant",
                "content": [
                    {"type": "text", "text": "Creating the file."},
                    {"type": "tool_use", "id": "toolu_1", "name": "write_file",
                     "input": {"path": "a.txt", "content": "hi"}}
                ],
                "stop_reason": "tool_use"
            })))
            .mount(&server)
            .await;

        let provider =
            AnthropicProvider::with_base_url("ak-test", &server.uri(), "claude-3-opus-20240229")
                .unwrap();
        let completion = provider
            .complete(&[Message::user("write a.txt")], GenerateOptions::default())
            .await
            .unwrap();

        assert_eq!(completion.finish_reason, FinishReason::ToolUse);
        assert_eq!(completion.message.text(), "Creating the file.");
        let call = &completion.message.tool_calls[0];
        assert_eq!(call.id, "toolu_1");
        assert_eq!(call.function.name, "write_file");
        let args: Value = serde_json::from_str(&call.function.arguments).unwrap();
        assert_eq!(args["path"], "a.txt");
    }

    #[tokio::test]
    async fn test_complete_reports_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(529).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let provider =
            AnthropicProvider::with_base_url("ak-test", &server.uri(), "claude").unwrap();
        let err = provider
            .complete(&[Message::user("hi")], GenerateOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "anthropic 529: overloaded");
    }
}
