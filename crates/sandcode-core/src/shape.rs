//! Classification of model replies into tool-call shapes.
//!
//! Models ask for tools in several ways. The classifier tries each shape in
//! a fixed priority order and the first match wins:
//!
//! 1. a legacy `function_call` field
//! 2. a batched `tool_calls` field
//! 3. a `<tool-use>{...}</tool-use>` block inside the text
//! 4. text that is a JSON object with a `tool_calls` list
//!
//! Anything else is a final answer.

use regex::Regex;
use sandcode_provider::Message;
use serde_json::{Map, Value};
use std::sync::OnceLock;

static TAG_REGEX: OnceLock<Regex> = OnceLock::new();

fn tag_regex() -> &'static Regex {
    TAG_REGEX.get_or_init(|| {
        Regex::new(r"<tool-use>\s*(\{[\s\S]*?\})\s*</tool-use>")
            .expect("Invalid regex pattern - this is a compile-time constant")
    })
}

/// Tools whose single string argument is a path.
const PATH_TOOLS: &[&str] = &["read_file", "delete_file", "make_dir", "create_dir", "mkdir"];

/// One tool the model asked for.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub name: String,
    /// Always a JSON object.
    pub args: Value,
    /// Correlation id for batched calls.
    pub id: Option<String>,
}

impl ToolInvocation {
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self {
            name: name.into(),
            args,
            id: None,
        }
    }
}

/// A classified model reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseShape {
    LegacyFunctionCall(ToolInvocation),
    BatchedToolCalls(Vec<ToolInvocation>),
    TaggedBlock(ToolInvocation),
    JsonEnvelope {
        message: Option<String>,
        calls: Vec<ToolInvocation>,
    },
    Final,
}

impl ResponseShape {
    /// Classify an assistant message.
    pub fn classify(message: &Message) -> Self {
        if let Some(shape) = parse_legacy(message) {
            return shape;
        }
        if let Some(shape) = parse_batched(message) {
            return shape;
        }
        if let Some(shape) = parse_tagged(message.text()) {
            return shape;
        }
        if let Some(shape) = parse_envelope(message.text()) {
            return shape;
        }
        Self::Final
    }

    pub fn is_final(&self) -> bool {
        matches!(self, Self::Final)
    }

    /// The requested invocations, in order.
    pub fn invocations(&self) -> Vec<&ToolInvocation> {
        match self {
            Self::LegacyFunctionCall(call) | Self::TaggedBlock(call) => vec![call],
            Self::BatchedToolCalls(calls) | Self::JsonEnvelope { calls, .. } => calls.iter().collect(),
            Self::Final => Vec::new(),
        }
    }

    /// Whether follow-up calls keep the tool declarations. Batched calls and
    /// envelopes are followed up without them.
    pub fn follow_up_with_tools(&self) -> bool {
        matches!(self, Self::LegacyFunctionCall(_) | Self::TaggedBlock(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::LegacyFunctionCall(_) => "legacy_function_call",
            Self::BatchedToolCalls(_) => "batched_tool_calls",
            Self::TaggedBlock(_) => "tagged_block",
            Self::JsonEnvelope { .. } => "json_envelope",
            Self::Final => "final",
        }
    }
}

fn parse_legacy(message: &Message) -> Option<ResponseShape> {
    let call = message.function_call.as_ref()?;
    let args = match serde_json::from_str::<Value>(non_empty_or_object(&call.arguments)) {
        Ok(Value::Object(map)) => Value::Object(map),
        _ => empty_object(),
    };
    Some(ResponseShape::LegacyFunctionCall(ToolInvocation::new(
        call.name.clone(),
        args,
    )))
}

fn parse_batched(message: &Message) -> Option<ResponseShape> {
    if message.tool_calls.is_empty() {
        return None;
    }
    let calls = message
        .tool_calls
        .iter()
        .map(|call| ToolInvocation {
            name: call.function.name.clone(),
            args: parse_string_args(&call.function.name, &call.function.arguments),
            id: Some(call.id.clone()),
        })
        .collect();
    Some(ResponseShape::BatchedToolCalls(calls))
}

fn parse_tagged(content: &str) -> Option<ResponseShape> {
    let json = tag_regex().captures(content)?.get(1)?.as_str();
    let spec: Map<String, Value> = serde_json::from_str(json).ok()?;

    let function = spec.get("function").and_then(Value::as_object);
    let name = function
        .and_then(|f| f.get("name"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    let args = first_object([
        spec.get("parameters"),
        function.and_then(|f| f.get("parameters")),
    ])
    .unwrap_or_else(empty_object);

    Some(ResponseShape::TaggedBlock(ToolInvocation::new(name, args)))
}

fn parse_envelope(content: &str) -> Option<ResponseShape> {
    let object: Map<String, Value> = serde_json::from_str(content.trim()).ok()?;
    let calls = object
        .get("tool_calls")
        .or_else(|| object.get("tool calls"))
        .and_then(Value::as_array)
        .filter(|calls| !calls.is_empty())?;

    let message = match object.get("message") {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) if text.is_empty() => None,
        Some(Value::String(text)) => Some(text.clone()),
        Some(other) => Some(other.to_string()),
    };

    let calls = calls.iter().map(envelope_call).collect();
    Some(ResponseShape::JsonEnvelope { message, calls })
}

fn envelope_call(call: &Value) -> ToolInvocation {
    let function = call.get("function").and_then(Value::as_object);
    let name = function
        .and_then(|f| f.get("name"))
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .or_else(|| call.get("name").and_then(Value::as_str))
        .unwrap_or_default()
        .to_string();

    let args = first_object([
        call.get("parameters"),
        function.and_then(|f| f.get("parameters")),
    ])
    .or_else(|| {
        call.get("arguments")
            .filter(|raw| is_truthy(raw))
            .map(|raw| coerce_args(&name, raw))
    })
    .unwrap_or_else(empty_object);

    ToolInvocation::new(name, args)
}

/// Normalize a raw argument value into an argument object.
///
/// Objects pass through and strings are parsed as JSON. A string that is not
/// a JSON object is wrapped under the key the tool expects: `path` for the
/// path tools, `dir` for `list_files`, `value` otherwise. Other values become
/// `{}`.
pub fn coerce_args(tool: &str, raw: &Value) -> Value {
    match raw {
        Value::Object(_) => raw.clone(),
        Value::String(text) => parse_string_args(tool, text),
        _ => empty_object(),
    }
}

fn parse_string_args(tool: &str, text: &str) -> Value {
    match serde_json::from_str::<Value>(non_empty_or_object(text)) {
        Ok(Value::Object(map)) => Value::Object(map),
        Ok(Value::String(inner)) => wrap_string(tool, inner),
        Ok(_) => empty_object(),
        Err(_) => wrap_string(tool, text.to_string()),
    }
}

fn wrap_string(tool: &str, value: String) -> Value {
    let key = if PATH_TOOLS.contains(&tool) {
        "path"
    } else if tool == "list_files" {
        "dir"
    } else {
        "value"
    };
    let mut map = Map::new();
    map.insert(key.to_string(), Value::String(value));
    Value::Object(map)
}

fn non_empty_or_object(text: &str) -> &str {
    if text.trim().is_empty() {
        "{}"
    } else {
        text
    }
}

/// The first candidate that is a non-empty object.
fn first_object<'a>(candidates: impl IntoIterator<Item = Option<&'a Value>>) -> Option<Value> {
    candidates
        .into_iter()
        .flatten()
        .find(|value| value.as_object().is_some_and(|map| !map.is_empty()))
        .cloned()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Number(_) => true,
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Surface the `message` field when the text is a JSON object carrying one.
pub fn envelope_message(content: &str) -> Option<String> {
    let object: Map<String, Value> = serde_json::from_str(content.trim()).ok()?;
    match object.get("message")? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
