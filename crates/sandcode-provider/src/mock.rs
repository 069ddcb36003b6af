//! Scripted model for tests.
//!
//! Downstream crates use [`MockModel`] to drive the orchestration loop without
//! network access.

use crate::{
    completion::Completion, error::ProviderError, message::Message, GenerateOptions,
    LanguageModel, ProviderResult,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A mock response for testing.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return a completion.
    Completion(Completion),
    /// Fail with an internal provider error.
    Error(String),
}

/// What the model saw on one call.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    /// Names of the tools declared on the request.
    pub tools: Vec<String>,
}

#[derive(Debug, Default)]
struct MockState {
    responses: VecDeque<MockResponse>,
    fallback: Option<Completion>,
    requests: Vec<RecordedRequest>,
}

/// Mock model returning queued responses in order.
///
/// Once the queue is empty the fallback completion (if any) is repeated,
/// otherwise a plain "Mock response" text is returned. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockModel {
    state: Arc<Mutex<MockState>>,
}

impl MockModel {
    /// Create a new mock model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock model that returns a fixed text response.
    pub fn with_text_response(text: impl Into<String>) -> Self {
        let model = Self::new();
        model.push(Completion::text(text));
        model
    }

    /// Queue a completion.
    pub fn push(&self, completion: Completion) -> &Self {
        self.with_state(|state| {
            state
                .responses
                .push_back(MockResponse::Completion(completion))
        });
        self
    }

    /// Queue an error.
    pub fn push_error(&self, message: impl Into<String>) -> &Self {
        let message = message.into();
        self.with_state(|state| state.responses.push_back(MockResponse::Error(message)));
        self
    }

    /// Completion to repeat once the queue is drained.
    pub fn repeat(&self, completion: Completion) -> &Self {
        self.with_state(|state| state.fallback = Some(completion));
        self
    }

    /// Get the number of times complete was called.
    pub fn call_count(&self) -> usize {
        self.with_state(|state| state.requests.len())
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.with_state(|state| state.requests.clone())
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    async fn complete(
        &self,
        messages: &[Message],
        options: GenerateOptions,
    ) -> ProviderResult<Completion> {
        let response = self.with_state(|state| {
            state.requests.push(RecordedRequest {
                messages: messages.to_vec(),
                tools: options.tools.iter().map(|t| t.name.clone()).collect(),
            });
            state
                .responses
                .pop_front()
                .or_else(|| state.fallback.clone().map(MockResponse::Completion))
        });

        match response {
            Some(MockResponse::Completion(completion)) => Ok(completion),
            Some(MockResponse::Error(message)) => Err(ProviderError::internal(message)),
            None => Ok(Completion::text("Mock response")),
        }
    }

    fn provider_id(&self) -> &str {
        "mock"
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }
}
