//! Recovery of a tool call written into free text.
//!
//! Some models ignore the structured tool channel and answer with something
//! like `I'll press enter {"name": "send_key", "parameters": {"name": "Return"}}`.
//! The first brace-delimited span on a single line is tried as JSON.
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::models::tool::ToolCall;

lazy_static! {
    static ref INLINE_CALL: Regex = Regex::new(r"\{.*\}").unwrap();
}

/// Parse one inline tool call out of `text`. Returns `None` when there is
/// no span that decodes to `{"name": .., "parameters"|"arguments": {..}}`.
pub fn parse_tool_call(text: &str) -> Option<ToolCall> {
    let span = INLINE_CALL.find(text)?;
    let value: Value = match serde_json::from_str(span.as_str()) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(error = %e, "Inline tool call is not valid JSON");
            return None;
        }
    };

    let name = value.get("name")?.as_str()?;
    let container = value.get("parameters").or_else(|| value.get("arguments"))?;

    let parameters = match container {
        Value::Object(_) | Value::Null => container.clone(),
        // double encoded arguments
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(decoded) if decoded.is_object() => decoded,
            _ => return None,
        },
        _ => return None,
    };

    Some(ToolCall::new(name, parameters))
}
