use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};
use std::collections::HashSet;

use super::format::Completion;
use crate::errors::{ProviderError, ProviderResult};
use crate::models::message::ImageContent;
use crate::models::tool::{ToolCall, ToolDefinition};

const ELIDED_IMAGE: &str = "<omitted_base64_image>";

pub fn encode_image(image: &ImageContent) -> String {
    STANDARD.encode(&image.data)
}

/// Convert an image into an openai style data url block
pub fn openai_image_block(image: &ImageContent) -> Value {
    json!({
        "type": "image_url",
        "image_url": {
            "url": format!("data:{};base64,{}", image.mime_type(), encode_image(image))
        }
    })
}

pub fn text_block(text: &str) -> Value {
    json!({
        "type": "text",
        "text": text,
    })
}

/// Reject a tool list that registers the same name twice
pub fn ensure_unique_names(tools: &[ToolDefinition]) -> ProviderResult<()> {
    let mut tool_names = HashSet::new();
    for tool in tools {
        if !tool_names.insert(tool.name.as_str()) {
            return Err(ProviderError::Schema(format!(
                "Duplicate tool name: {}",
                tool.name
            )));
        }
    }
    Ok(())
}

/// Convert internal tool definitions to OpenAI's API tool specification
pub fn tools_to_openai_spec(tools: &[ToolDefinition]) -> ProviderResult<Vec<Value>> {
    ensure_unique_names(tools)?;

    Ok(tools
        .iter()
        .map(|tool| {
            json!({
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.parameters_schema(),
                }
            })
        })
        .collect())
}

/// Decode a tool call's argument payload. Vendors send either a JSON string
/// or an already structured object; an empty string means no arguments.
pub fn parse_arguments(arguments: &Value) -> Result<Value, serde_json::Error> {
    match arguments {
        Value::String(raw) if raw.trim().is_empty() => Ok(json!({})),
        Value::String(raw) => serde_json::from_str(raw),
        Value::Null => Ok(json!({})),
        other => Ok(other.clone()),
    }
}

/// Convert an OpenAI style response body into a completion. Calls whose
/// arguments are not valid JSON are dropped.
pub fn openai_response_to_completion(response: &Value) -> ProviderResult<Completion> {
    let choice = response
        .get("choices")
        .and_then(|choices| choices.as_array())
        .and_then(|choices| choices.first())
        .ok_or_else(|| ProviderError::EmptyResponse(elide_images(response).to_string()))?;

    let message = &choice["message"];
    let text = message
        .get("content")
        .and_then(|content| content.as_str())
        .map(str::to_string);

    let mut completion = Completion {
        text,
        ..Default::default()
    };

    if let Some(tool_calls) = message.get("tool_calls").and_then(|calls| calls.as_array()) {
        for tool_call in tool_calls {
            let function_name = tool_call["function"]["name"]
                .as_str()
                .unwrap_or_default()
                .to_string();
            let arguments = &tool_call["function"]["arguments"];

            match parse_arguments(arguments) {
                Ok(parameters) if parameters.is_object() => {
                    completion
                        .tool_calls
                        .push(ToolCall::new(function_name, parameters));
                }
                Ok(_) | Err(_) => {
                    tracing::warn!(
                        tool = %function_name,
                        arguments = %arguments,
                        "Error decoding JSON for tool call arguments"
                    );
                    completion.dropped_calls += 1;
                }
            }
        }
    }

    Ok(completion)
}

/// Copy of a request body with base64 image payloads replaced, for logging
pub fn elide_images(payload: &Value) -> Value {
    match payload {
        Value::Object(map) => {
            let mut elided = serde_json::Map::new();
            for (key, value) in map {
                let replaced = match (key.as_str(), value) {
                    ("url", Value::String(url)) if url.starts_with("data:") => {
                        Value::String(ELIDED_IMAGE.to_string())
                    }
                    ("data", Value::String(_)) if map.get("type") == Some(&json!("base64")) => {
                        Value::String(ELIDED_IMAGE.to_string())
                    }
                    _ => elide_images(value),
                };
                elided.insert(key.clone(), replaced);
            }
            Value::Object(elided)
        }
        Value::Array(items) => Value::Array(items.iter().map(elide_images).collect()),
        other => other.clone(),
    }
}
