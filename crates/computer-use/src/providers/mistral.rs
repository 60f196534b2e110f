use reqwest::RequestBuilder;
use serde_json::{json, Value};

use super::format::{ChatFormat, Completion};
use super::openai::OpenAiFormat;
use crate::errors::ProviderResult;
use crate::models::message::{Message, MessageContent, Role};
use crate::models::tool::ToolDefinition;

/// Mistral speaks the OpenAI dialect but rejects a request whose last
/// message was written by the assistant.
#[derive(Debug, Clone, Copy, Default)]
pub struct MistralFormat {
    inner: OpenAiFormat,
}

impl ChatFormat for MistralFormat {
    fn endpoint(&self) -> &'static str {
        self.inner.endpoint()
    }

    fn authorize(&self, request: RequestBuilder, api_key: &str) -> RequestBuilder {
        self.inner.authorize(request, api_key)
    }

    fn compile_tools(&self, tools: &[ToolDefinition]) -> ProviderResult<Vec<Value>> {
        self.inner.compile_tools(tools)
    }

    fn wrap_block(&self, content: &MessageContent) -> Value {
        self.inner.wrap_block(content)
    }

    fn role_name(&self, role: Role) -> &'static str {
        self.inner.role_name(role)
    }

    fn transform_message(&self, message: &Message) -> Value {
        self.inner.transform_message(message)
    }

    /// A final message sent as assistant is folded into the user message before it
    /// as a text prefix, or becomes a user message of its own. Earlier turns
    /// are sent unchanged.
    fn transform_messages(&self, messages: &[Message]) -> Vec<Value> {
        let Some((last, head)) = messages.split_last() else {
            return Vec::new();
        };
        if self.role_name(last.role()) != "assistant" {
            return self.inner.transform_messages(messages);
        }

        let prefix: Vec<Value> = last.content.iter().map(|content| self.wrap_block(content)).collect();
        let mut converted = self.inner.transform_messages(head);
        match (head.last(), converted.last_mut()) {
            (Some(previous), Some(wire)) if previous.role() == Role::User => {
                let mut content = prefix;
                if let Some(blocks) = wire["content"].as_array() {
                    content.extend(blocks.iter().cloned());
                }
                wire["content"] = json!(content);
            }
            _ => converted.push(json!({
                "role": "user",
                "content": prefix,
            })),
        }
        converted
    }

    fn build_request(&self, model: &str, messages: &[Message], tools: &[Value]) -> Value {
        let mut payload = json!({
            "model": model,
            "messages": self.transform_messages(messages),
        });
        if !tools.is_empty() {
            payload["tools"] = json!(tools);
        }
        payload
    }

    fn parse_response(&self, response: &Value) -> ProviderResult<Completion> {
        self.inner.parse_response(response)
    }
}
