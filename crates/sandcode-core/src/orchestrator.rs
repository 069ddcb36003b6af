//! The chat orchestration loop.
//!
//! One turn resolves the model, prepares the sandbox, then alternates model
//! calls and tool execution until the model gives a final answer or the
//! iteration cap is reached.

use crate::catalog::ModelCatalog;
use crate::config::Config;
use crate::error::CoreResult;
use crate::policy::{system_prompt, PolicyConfig, TaskMode};
use crate::shape::{envelope_message, ResponseShape, ToolInvocation};
use regex::Regex;
use sandcode_provider::{
    create_provider, options_for, BoxedLanguageModel, Completion, Message, ProviderKind,
    ProviderResult, ProviderSettings, ToolDefinition,
};
use sandcode_sandbox::SharedSandbox;
use sandcode_tools::{ToolContext, ToolRegistry};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

/// Project used when a request names none.
pub const DEFAULT_PROJECT: &str = "scratch";

static LOCALHOST_REGEX: OnceLock<Regex> = OnceLock::new();

fn localhost_regex() -> &'static Regex {
    LOCALHOST_REGEX.get_or_init(|| {
        Regex::new(r"https?://localhost:\d+")
            .expect("Invalid regex pattern - this is a compile-time constant")
    })
}

/// Builds the model adapter for a catalog entry.
#[cfg_attr(test, mockall::automock)]
pub trait ProviderFactory: Send + Sync {
    fn create(&self, kind: ProviderKind, model: &str) -> ProviderResult<BoxedLanguageModel>;
}

/// Factory building real HTTP adapters from per-provider settings.
#[derive(Debug, Clone, Default)]
pub struct EnvProviderFactory {
    settings: HashMap<ProviderKind, ProviderSettings>,
}

impl EnvProviderFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings for every provider from configuration.
    pub fn from_config(config: &Config) -> Self {
        let settings = [ProviderKind::OpenAI, ProviderKind::Groq, ProviderKind::Anthropic]
            .into_iter()
            .map(|kind| (kind, config.provider_settings(kind)))
            .collect();
        Self { settings }
    }
}

impl ProviderFactory for EnvProviderFactory {
    fn create(&self, kind: ProviderKind, model: &str) -> ProviderResult<BoxedLanguageModel> {
        let settings = self.settings.get(&kind).cloned().unwrap_or_default();
        create_provider(kind, model, &settings)
    }
}

/// One chat turn.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    /// Catalog label; the default label when absent.
    pub model: Option<String>,
    /// Sandbox project; `scratch` when absent.
    pub project: Option<String>,
}

/// Result of a chat turn.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    /// Final assistant text.
    pub assistant: String,
    /// The conversation as sent to the model, plus the final reply.
    pub messages: Vec<Message>,
    /// Tool rounds executed.
    pub iterations: usize,
    /// Tool invocations executed.
    pub tool_calls: usize,
}

/// Drives model calls and tool execution for chat requests.
pub struct Orchestrator {
    factory: Arc<dyn ProviderFactory>,
    catalog: ModelCatalog,
    policy: PolicyConfig,
    registry: Arc<ToolRegistry>,
    sandbox: SharedSandbox,
    sampling: ProviderSettings,
}

impl Orchestrator {
    /// Create an orchestrator with the built-in catalog and default policy.
    pub fn new(
        factory: Arc<dyn ProviderFactory>,
        registry: Arc<ToolRegistry>,
        sandbox: SharedSandbox,
    ) -> Self {
        Self {
            factory,
            catalog: ModelCatalog::builtin(),
            policy: PolicyConfig::default(),
            registry,
            sandbox,
            sampling: ProviderSettings::default(),
        }
    }

    /// Orchestrator wired from configuration with the built-in tools.
    pub fn from_config(config: &Config, sandbox: SharedSandbox) -> Self {
        Self::new(
            Arc::new(EnvProviderFactory::from_config(config)),
            Arc::new(ToolRegistry::with_builtins()),
            sandbox,
        )
        .with_catalog(config.catalog())
        .with_policy(config.policy())
    }

    pub fn with_catalog(mut self, catalog: ModelCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_policy(mut self, policy: PolicyConfig) -> Self {
        self.policy = policy;
        self
    }

    /// Temperature and token limit sent with every request.
    pub fn with_sampling(mut self, sampling: ProviderSettings) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn sandbox(&self) -> &SharedSandbox {
        &self.sandbox
    }

    /// Run one chat turn to completion.
    pub async fn chat(&self, request: ChatRequest) -> CoreResult<ChatOutcome> {
        let (label, entry) = self.catalog.resolve(request.model.as_deref());
        let project = request
            .project
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(DEFAULT_PROJECT);

        info!(model = %label, provider = %entry.provider, project = %project, "Starting chat turn");

        let model = self.factory.create(entry.provider, &entry.model)?;
        self.sandbox.lock().await.init(project, None, None).await?;

        let mode = self.policy.classify(&request.messages);
        let max_iterations = self.policy.max_iterations(mode);
        debug!(ui = mode.ui, large = mode.large, max_iterations, "Classified task");

        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(prompt) = system_prompt(mode) {
            messages.push(Message::system(prompt));
        }
        messages.extend(request.messages);

        let tools = self.registry.definitions();
        let ctx = ToolContext::new(self.sandbox.clone());

        let mut completion = self.first_call(&model, &messages, tools).await?;
        let mut iterations = 0;
        let mut tool_calls = 0;
        let mut dev_started = false;

        loop {
            let shape = ResponseShape::classify(&completion.message);
            if shape.is_final() {
                break;
            }
            if iterations >= max_iterations {
                warn!(max_iterations, "Iteration cap reached, returning last reply");
                break;
            }
            iterations += 1;

            debug!(shape = shape.kind(), iteration = iterations, "Executing tool round");
            tool_calls += self
                .execute_round(&shape, completion.message, &mut messages, &ctx)
                .await;

            if mode.ui
                && !dev_started
                && matches!(
                    shape,
                    ResponseShape::BatchedToolCalls(_) | ResponseShape::JsonEnvelope { .. }
                )
            {
                dev_started = self.start_dev().await;
            }

            let follow_up = shape.follow_up_with_tools().then_some(tools);
            completion = model
                .complete(&messages, options_for(&self.sampling, follow_up))
                .await?;
        }

        let assistant = self.final_text(completion.message.text(), mode).await;
        messages.push(Message::assistant(assistant.clone()));

        info!(iterations, tool_calls, "Chat turn finished");
        Ok(ChatOutcome {
            assistant,
            messages,
            iterations,
            tool_calls,
        })
    }

    /// First request with tools, retried once without them.
    async fn first_call(
        &self,
        model: &BoxedLanguageModel,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> CoreResult<Completion> {
        match model
            .complete(messages, options_for(&self.sampling, Some(tools)))
            .await
        {
            Ok(completion) => Ok(completion),
            Err(e) => {
                warn!(error = %e, "Model call with tools failed, retrying without tools");
                Ok(model
                    .complete(messages, options_for(&self.sampling, None))
                    .await?)
            }
        }
    }

    /// Execute the invocations of one reply and append the assistant message
    /// and results. Returns the number of invocations run.
    async fn execute_round(
        &self,
        shape: &ResponseShape,
        reply: Message,
        messages: &mut Vec<Message>,
        ctx: &ToolContext,
    ) -> usize {
        match shape {
            ResponseShape::LegacyFunctionCall(call) => {
                messages.push(reply);
                let result = self.run(call, ctx).await;
                messages.push(Message::function_result(&call.name, result));
                1
            }
            ResponseShape::BatchedToolCalls(calls) => {
                messages.push(reply);
                for call in calls {
                    let result = self.run(call, ctx).await;
                    messages.push(Message::tool_result(
                        call.id.clone().unwrap_or_default(),
                        result,
                    ));
                }
                calls.len()
            }
            ResponseShape::TaggedBlock(call) => {
                messages.push(Message::assistant(reply.text()));
                let result = self.run(call, ctx).await;
                messages.push(Message::function_result(&call.name, result));
                1
            }
            ResponseShape::JsonEnvelope { message, calls } => {
                if let Some(text) = message {
                    messages.push(Message::assistant(text.clone()));
                }
                for call in calls {
                    let result = self.run(call, ctx).await;
                    messages.push(Message::function_result(&call.name, result));
                }
                calls.len()
            }
            ResponseShape::Final => 0,
        }
    }

    async fn run(&self, call: &ToolInvocation, ctx: &ToolContext) -> String {
        self.registry
            .dispatch(&call.name, call.args.clone(), ctx)
            .await
            .to_string()
    }

    /// Start the dev server, logging failures. Returns whether it started.
    async fn start_dev(&self) -> bool {
        match self.sandbox.lock().await.start_dev().await {
            Ok(meta) => {
                info!(url = %meta.url, "Dev server started");
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to start dev server");
                false
            }
        }
    }

    async fn final_text(&self, content: &str, mode: TaskMode) -> String {
        let text = envelope_message(content).unwrap_or_else(|| content.to_string());
        if !mode.ui {
            return text;
        }

        let url = {
            let sandbox = self.sandbox.lock().await;
            sandbox
                .meta()
                .map(|meta| meta.url.clone())
                .unwrap_or_else(|| sandbox.config().dev_url())
        };

        let text = localhost_regex()
            .replace_all(&text, url.as_str())
            .trim()
            .to_string();
        if text.is_empty() {
            format!("App is running at {url}.")
        } else if !text.contains("http") {
            format!("{text} App is running at {url}.")
        } else {
            text
        }
    }
}
