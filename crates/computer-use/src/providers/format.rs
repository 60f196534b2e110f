//! The capability interface each vendor wire format implements.
//!
//! A format knows how to shape a request (tool schema, content blocks,
//! system prompt placement) and how to read the vendor's answer. Transport,
//! error signalling and the text fallback for tool calls live in
//! [`ChatProvider`](super::chat::ChatProvider), which drives any format.
use reqwest::RequestBuilder;
use serde_json::{json, Value};

use crate::errors::ProviderResult;
use crate::models::message::{Message, MessageContent, Role};
use crate::models::tool::{ToolCall, ToolDefinition};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    OpenAi,
    Anthropic,
    Mistral,
}

/// A normalized model answer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    /// Structured calls the vendor returned but that could not be decoded
    pub dropped_calls: usize,
}

impl Completion {
    /// Whether the vendor returned any structured call at all, including dropped ones
    pub fn has_structured_calls(&self) -> bool {
        !self.tool_calls.is_empty() || self.dropped_calls > 0
    }
}

pub trait ChatFormat: Send + Sync {
    /// Path of the completion endpoint, relative to the base url
    fn endpoint(&self) -> &'static str;

    /// Attach credentials to a request
    fn authorize(&self, request: RequestBuilder, api_key: &str) -> RequestBuilder;

    /// Compile tool definitions into the vendor's tool schema, in order
    fn compile_tools(&self, tools: &[ToolDefinition]) -> ProviderResult<Vec<Value>>;

    /// Convert one content block, encoding images as the vendor expects
    fn wrap_block(&self, content: &MessageContent) -> Value;

    /// The role name sent on the wire
    fn role_name(&self, role: Role) -> &'static str;

    fn transform_message(&self, message: &Message) -> Value {
        let blocks: Vec<Value> = message
            .content
            .iter()
            .map(|content| self.wrap_block(content))
            .collect();
        json!({
            "role": self.role_name(message.role()),
            "content": blocks,
        })
    }

    fn transform_messages(&self, messages: &[Message]) -> Vec<Value> {
        messages
            .iter()
            .map(|message| self.transform_message(message))
            .collect()
    }

    /// Build the full request body. `tools` is already compiled.
    fn build_request(&self, model: &str, messages: &[Message], tools: &[Value]) -> Value;

    /// Read text and tool calls out of a successful response body
    fn parse_response(&self, response: &Value) -> ProviderResult<Completion>;
}
