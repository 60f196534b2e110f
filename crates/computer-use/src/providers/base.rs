use async_trait::async_trait;

use crate::errors::ProviderResult;
use crate::models::message::Message;
use crate::models::tool::{ToolCall, ToolDefinition};

/// Base trait for AI providers (OpenAI, Anthropic, etc)
#[async_trait]
pub trait Provider: Send + Sync {
    /// The vendor model id requests are sent to
    fn model(&self) -> &str;

    /// Plain completion, returning the model's text
    async fn call(&self, messages: &[Message]) -> ProviderResult<String>;

    /// Completion with tools. Returns the model's text, if it should be kept
    /// as a message, and the tool calls it requested in order.
    async fn call_with_tools(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> ProviderResult<(Option<String>, Vec<ToolCall>)>;
}
