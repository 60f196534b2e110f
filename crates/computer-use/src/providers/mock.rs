use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::errors::{ProviderError, ProviderResult};
use crate::models::message::Message;
use crate::models::tool::{ToolCall, ToolDefinition};
use crate::providers::base::Provider;

/// One scripted answer
pub enum MockResponse {
    Text(String),
    Tools(Option<String>, Vec<ToolCall>),
    Error(String),
}

/// A mock provider that returns pre-configured responses for testing and
/// records every request it receives
#[derive(Clone, Default)]
pub struct MockProvider {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    requests: Arc<Mutex<Vec<Vec<Message>>>>,
    cancel_on_call: Option<CancellationToken>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of responses
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into())),
            requests: Arc::default(),
            cancel_on_call: None,
        }
    }

    /// Cancel `token` whenever this provider is called
    pub fn cancelling(mut self, token: CancellationToken) -> Self {
        self.cancel_on_call = Some(token);
        self
    }

    /// Conversations passed to each call, in call order
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }

    fn next(&self, messages: &[Message]) -> Option<MockResponse> {
        self.requests.lock().unwrap().push(messages.to_vec());
        if let Some(token) = &self.cancel_on_call {
            token.cancel();
        }
        self.responses.lock().unwrap().pop_front()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn model(&self) -> &str {
        "mock"
    }

    async fn call(&self, messages: &[Message]) -> ProviderResult<String> {
        match self.next(messages) {
            Some(MockResponse::Text(text)) => Ok(text),
            Some(MockResponse::Tools(text, _)) => Ok(text.unwrap_or_default()),
            Some(MockResponse::Error(message)) => Err(ProviderError::Api(message)),
            // Return empty response if no more pre-configured responses
            None => Ok(String::new()),
        }
    }

    async fn call_with_tools(
        &self,
        messages: &[Message],
        _tools: &[ToolDefinition],
    ) -> ProviderResult<(Option<String>, Vec<ToolCall>)> {
        match self.next(messages) {
            Some(MockResponse::Text(text)) => Ok((Some(text), Vec::new())),
            Some(MockResponse::Tools(text, calls)) => Ok((text, calls)),
            Some(MockResponse::Error(message)) => Err(ProviderError::Api(message)),
            None => Ok((None, Vec::new())),
        }
    }
}
