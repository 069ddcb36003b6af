//! Normalized model replies.

use crate::message::Message;
use serde::{Deserialize, Serialize};

/// One non-streaming reply from a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    /// The assistant message in OpenAI shape.
    pub message: Message,
    /// Why the model stopped.
    pub finish_reason: FinishReason,
}

impl Completion {
    /// A plain text reply that ended normally.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            message: Message::assistant(text),
            finish_reason: FinishReason::Stop,
        }
    }

    /// A reply carrying only batched tool calls.
    pub fn tool_calls(calls: Vec<crate::message::ToolCall>) -> Self {
        Self {
            message: Message::assistant_tool_calls(None, calls),
            finish_reason: FinishReason::ToolUse,
        }
    }

    /// Override the finish reason.
    pub fn with_finish_reason(mut self, reason: FinishReason) -> Self {
        self.finish_reason = reason;
        self
    }
}

/// Reason for finishing a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural end of turn (Anthropic `end_turn`).
    EndTurn,
    /// Stopped normally (OpenAI `stop`, Anthropic `stop_sequence`).
    Stop,
    /// Stopped due to max tokens.
    MaxTokens,
    /// Stopped for tool use.
    ToolUse,
    /// Content was filtered.
    ContentFilter,
    /// Unknown or missing reason.
    #[default]
    Other,
}

impl FinishReason {
    /// Parse from Anthropic's stop_reason.
    pub fn from_anthropic(reason: &str) -> Self {
        match reason {
            "end_turn" => Self::EndTurn,
            "stop_sequence" => Self::Stop,
            "max_tokens" => Self::MaxTokens,
            "tool_use" => Self::ToolUse,
            _ => Self::Other,
        }
    }

    /// Parse from OpenAI's finish_reason.
    pub fn from_openai(reason: &str) -> Self {
        match reason {
            "stop" => Self::Stop,
            "length" => Self::MaxTokens,
            "tool_calls" | "function_call" => Self::ToolUse,
            "content_filter" => Self::ContentFilter,
            _ => Self::Other,
        }
    }
}
