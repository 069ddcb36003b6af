//! LLM provider adapters for sandcode.
//!
//! Every provider is driven through the same non-streaming interface:
//! - OpenAI (chat completions)
//! - Groq (OpenAI-compatible endpoint)
//! - Anthropic (messages API, converted to and from the OpenAI shape)
//!
//! [`call`] is the single entry point used by the orchestrator. It builds the
//! adapter for a [`ProviderKind`] and performs exactly one request.

pub mod completion;
pub mod error;
pub mod message;

pub mod anthropic;
pub mod groq;
pub mod openai;

pub mod mock;

pub use completion::{Completion, FinishReason};
pub use error::{ProviderError, ProviderResult};
pub use message::{FunctionCall, Message, Role, ToolCall};
pub use mock::MockModel;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Options for a single completion request.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Temperature for sampling (0.0-1.0).
    pub temperature: Option<f32>,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
    /// Available tools. Empty means the request carries no tool declarations.
    pub tools: Vec<ToolDefinition>,
}

/// A tool definition for the AI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// Tool description.
    pub description: String,
    /// JSON Schema for the tool parameters.
    pub parameters: Value,
}

/// The main trait for AI language models.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Request one reply for the conversation so far.
    async fn complete(
        &self,
        messages: &[Message],
        options: GenerateOptions,
    ) -> ProviderResult<Completion>;

    /// Get the provider ID (e.g., "anthropic", "openai").
    fn provider_id(&self) -> &str;

    /// Get the model ID sent on the wire.
    fn model_id(&self) -> &str;
}

/// A boxed language model for dynamic dispatch.
pub type BoxedLanguageModel = Arc<dyn LanguageModel>;

/// Supported providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAI,
    Groq,
    Anthropic,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "openai",
            ProviderKind::Groq => "groq",
            ProviderKind::Anthropic => "anthropic",
        }
    }

    /// Environment variable holding the API key.
    pub fn env_var(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "OPENAI_API_KEY",
            ProviderKind::Groq => "GROQ_API_KEY",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    /// Default API base URL.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => openai::OPENAI_API_URL,
            ProviderKind::Groq => groq::GROQ_API_URL,
            ProviderKind::Anthropic => anthropic::ANTHROPIC_API_URL,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAI),
            "groq" => Ok(ProviderKind::Groq),
            "anthropic" => Ok(ProviderKind::Anthropic),
            other => Err(ProviderError::UnknownProvider(other.to_string())),
        }
    }
}

/// Per-provider connection and sampling settings.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Explicit API key. Falls back to the provider's environment variable.
    pub api_key: Option<String>,
    /// Override of the default base URL.
    pub base_url: Option<String>,
    pub timeout: Duration,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            timeout: Duration::from_secs(60),
            temperature: 0.2,
            max_tokens: 1024,
        }
    }
}

impl ProviderSettings {
    /// Resolve the API key from settings, then the environment.
    pub fn resolve_api_key(&self, kind: ProviderKind) -> ProviderResult<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| {
                std::env::var(kind.env_var())
                    .ok()
                    .filter(|key| !key.trim().is_empty())
            })
            .ok_or_else(|| ProviderError::missing_api_key(kind.env_var()))
    }

    fn base_url(&self, kind: ProviderKind) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| kind.default_base_url())
    }
}

/// Build the adapter for `kind` serving `model`.
pub fn create_provider(
    kind: ProviderKind,
    model: &str,
    settings: &ProviderSettings,
) -> ProviderResult<BoxedLanguageModel> {
    let api_key = settings.resolve_api_key(kind)?;
    let base_url = settings.base_url(kind);

    debug!(provider = %kind, model = %model, base_url = %base_url, "Creating provider");

    let provider: BoxedLanguageModel = match kind {
        ProviderKind::OpenAI => Arc::new(
            openai::OpenAIProvider::with_base_url(&api_key, base_url, model)?
                .with_timeout(settings.timeout),
        ),
        ProviderKind::Groq => Arc::new(
            groq::GroqProvider::with_base_url(&api_key, base_url, model)?
                .with_timeout(settings.timeout),
        ),
        ProviderKind::Anthropic => Arc::new(
            anthropic::AnthropicProvider::with_base_url(&api_key, base_url, model)?
                .with_timeout(settings.timeout),
        ),
    };
    Ok(provider)
}

/// Options derived from settings, with or without tool declarations.
pub fn options_for(settings: &ProviderSettings, tools: Option<&[ToolDefinition]>) -> GenerateOptions {
    GenerateOptions {
        temperature: Some(settings.temperature),
        max_tokens: Some(settings.max_tokens),
        tools: tools.map(<[ToolDefinition]>::to_vec).unwrap_or_default(),
    }
}

/// Perform one completion request. Never retries.
pub async fn call(
    kind: ProviderKind,
    model: &str,
    messages: &[Message],
    tools: Option<&[ToolDefinition]>,
    settings: &ProviderSettings,
) -> ProviderResult<Completion> {
    let provider = create_provider(kind, model, settings)?;
    provider
        .complete(messages, options_for(settings, tools))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!("openai".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAI);
        assert_eq!(" Groq ".parse::<ProviderKind>().unwrap(), ProviderKind::Groq);
        assert_eq!(
            "anthropic".parse::<ProviderKind>().unwrap(),
            ProviderKind::Anthropic
        );

        let err = "cohere".parse::<ProviderKind>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown provider cohere");
    }

    #[test]
    fn test_provider_kind_serde() {
        assert_eq!(
            serde_json::to_string(&ProviderKind::OpenAI).unwrap(),
            "\"openai\""
        );
        let kind: ProviderKind = serde_json::from_str("\"anthropic\"").unwrap();
        assert_eq!(kind, ProviderKind::Anthropic);
    }

    #[test]
    fn test_explicit_key_wins() {
        let settings = ProviderSettings {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        assert_eq!(
            settings.resolve_api_key(ProviderKind::Groq).unwrap(),
            "sk-test"
        );
    }

    #[test]
    fn test_blank_key_is_missing() {
        let settings = ProviderSettings {
            api_key: Some("   ".to_string()),
            ..Default::default()
        };
        match settings.resolve_api_key(ProviderKind::Anthropic) {
            Ok(key) => assert!(!key.trim().is_empty()),
            Err(err) => assert_eq!(err.to_string(), "ANTHROPIC_API_KEY not set in environment"),
        }
    }

    #[test]
    fn test_options_for_tools() {
        let settings = ProviderSettings::default();
        let tools = vec![ToolDefinition {
            name: "read_file".to_string(),
            description: "Read".to_string(),
            parameters: serde_json::json!({"type": "object"}),
        }];

        let with = options_for(&settings, Some(&tools));
        assert_eq!(with.tools.len(), 1);
        assert_eq!(with.temperature, Some(0.2));
        assert_eq!(with.max_tokens, Some(1024));

        let without = options_for(&settings, None);
        assert!(without.tools.is_empty());
    }
}
