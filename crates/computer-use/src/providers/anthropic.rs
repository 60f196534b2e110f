use reqwest::RequestBuilder;
use serde_json::{json, Value};

use super::format::{ChatFormat, Completion};
use super::utils::{encode_image, ensure_unique_names, text_block};
use crate::errors::{ProviderError, ProviderResult};
use crate::models::message::{Message, MessageContent, Role};
use crate::models::tool::{ToolCall, ToolDefinition};

pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// The Anthropic messages dialect. System prompts travel in a separate
/// `system` field and tools use a flat `input_schema` shape.
#[derive(Debug, Clone, Copy)]
pub struct AnthropicFormat {
    pub max_tokens: u32,
}

impl Default for AnthropicFormat {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl AnthropicFormat {
    /// Text of every system message, joined with newlines
    fn system_prompt(messages: &[Message]) -> String {
        messages
            .iter()
            .filter(|message| message.role() == Role::System)
            .map(|message| message.text())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl ChatFormat for AnthropicFormat {
    fn endpoint(&self) -> &'static str {
        "messages"
    }

    fn authorize(&self, request: RequestBuilder, api_key: &str) -> RequestBuilder {
        request
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
    }

    fn compile_tools(&self, tools: &[ToolDefinition]) -> ProviderResult<Vec<Value>> {
        ensure_unique_names(tools)?;

        Ok(tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "input_schema": tool.parameters_schema(),
                })
            })
            .collect())
    }

    fn wrap_block(&self, content: &MessageContent) -> Value {
        match content {
            MessageContent::Text(text) => text_block(&text.text),
            MessageContent::Image(image) => json!({
                "type": "image",
                "source": {
                    "type": "base64",
                    "media_type": image.mime_type(),
                    "data": encode_image(image),
                }
            }),
        }
    }

    fn role_name(&self, role: Role) -> &'static str {
        match role {
            Role::Assistant => "assistant",
            // system messages are lifted out before this is reached
            Role::System | Role::User | Role::Function => "user",
        }
    }

    fn transform_messages(&self, messages: &[Message]) -> Vec<Value> {
        messages
            .iter()
            .filter(|message| message.role() != Role::System)
            .map(|message| self.transform_message(message))
            .collect()
    }

    fn build_request(&self, model: &str, messages: &[Message], tools: &[Value]) -> Value {
        let mut payload = json!({
            "model": model,
            "max_tokens": self.max_tokens,
            "messages": self.transform_messages(messages),
        });

        let system = Self::system_prompt(messages);
        if !system.is_empty() {
            payload["system"] = json!(system);
        }
        if !tools.is_empty() {
            payload["tools"] = json!(tools);
        }
        payload
    }

    fn parse_response(&self, response: &Value) -> ProviderResult<Completion> {
        let blocks = response
            .get("content")
            .and_then(|content| content.as_array())
            .filter(|blocks| !blocks.is_empty())
            .ok_or_else(|| ProviderError::EmptyResponse(response.to_string()))?;

        let mut texts = Vec::new();
        let mut completion = Completion::default();

        for block in blocks {
            match block.get("type").and_then(|t| t.as_str()) {
                Some("text") => {
                    if let Some(text) = block.get("text").and_then(|t| t.as_str()) {
                        texts.push(text.to_string());
                    }
                }
                Some("tool_use") => {
                    let name = block["name"].as_str().unwrap_or_default();
                    match block.get("input") {
                        Some(input) if input.is_object() || input.is_null() => {
                            completion.tool_calls.push(ToolCall::new(name, input.clone()));
                        }
                        _ => {
                            tracing::warn!(tool = %name, "Tool use block without an input object");
                            completion.dropped_calls += 1;
                        }
                    }
                }
                _ => {}
            }
        }

        if !texts.is_empty() {
            completion.text = Some(texts.join("\n"));
        }
        Ok(completion)
    }
}
