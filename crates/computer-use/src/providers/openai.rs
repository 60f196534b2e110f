use reqwest::RequestBuilder;
use serde_json::{json, Value};

use super::format::{ChatFormat, Completion};
use super::utils::{openai_image_block, openai_response_to_completion, text_block, tools_to_openai_spec};
use crate::errors::ProviderResult;
use crate::models::message::{Message, MessageContent, Role};
use crate::models::tool::ToolDefinition;

/// The OpenAI chat completions dialect, spoken by most hosted vendors
/// (OpenAI, OpenRouter, Groq, Fireworks, DeepSeek, Gemini, Moonshot, ...).
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAiFormat;

impl ChatFormat for OpenAiFormat {
    fn endpoint(&self) -> &'static str {
        "chat/completions"
    }

    fn authorize(&self, request: RequestBuilder, api_key: &str) -> RequestBuilder {
        request.bearer_auth(api_key)
    }

    fn compile_tools(&self, tools: &[ToolDefinition]) -> ProviderResult<Vec<Value>> {
        tools_to_openai_spec(tools)
    }

    fn wrap_block(&self, content: &MessageContent) -> Value {
        match content {
            MessageContent::Text(text) => text_block(&text.text),
            MessageContent::Image(image) => openai_image_block(image),
        }
    }

    fn role_name(&self, role: Role) -> &'static str {
        match role {
            Role::System => "system",
            Role::User => "user",
            // A function message without a tool call id is rejected by most vendors
            Role::Assistant | Role::Function => "assistant",
        }
    }

    fn transform_message(&self, message: &Message) -> Value {
        // Several compatible vendors only accept a plain string for system content
        if message.role() == Role::System {
            return json!({
                "role": "system",
                "content": message.text(),
            });
        }

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
        openai_response_to_completion(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProviderError;
    use crate::models::tool::ToolCall;
    use crate::providers::base::Provider;
    use crate::providers::chat::ChatProvider;
    use crate::providers::configs::{ProviderConfig, Vendor};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    async fn setup_mock_server(response_body: Value) -> (MockServer, ChatProvider<OpenAiFormat>) {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test_api_key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(response_body))
            .mount(&mock_server)
            .await;

        let config = ProviderConfig::new(Vendor::Groq, "llama-3.3")
            .with_base_url(format!("{}/v1", mock_server.uri()))
            .with_api_key("test_api_key");

        let provider = ChatProvider::new(config, OpenAiFormat).unwrap();
        (mock_server, provider)
    }

    fn text_response(text: &str) -> Value {
        json!({
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": text,
                    "tool_calls": null
                },
                "finish_reason": "stop"
            }]
        })
    }

    #[test]
    fn test_transform_message_wraps_every_block() {
        let message = Message::user()
            .with_text("Describe what you see")
            .with_image(PNG_HEADER.to_vec());

        let converted = OpenAiFormat.transform_message(&message);
        assert_eq!(converted["role"], "user");
        assert_eq!(converted["content"][0], json!({"type": "text", "text": "Describe what you see"}));
        assert_eq!(converted["content"][1]["type"], "image_url");
        assert!(converted["content"][1]["image_url"]["url"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_system_message_is_plain_text() {
        let message = Message::system().with_text("You are an AI assistant.");
        let converted = OpenAiFormat.transform_message(&message);
        assert_eq!(
            converted,
            json!({"role": "system", "content": "You are an AI assistant."})
        );
    }

    #[test]
    fn test_function_role_is_sent_as_assistant() {
        let message = Message::function().with_text("OBSERVATION: done");
        assert_eq!(OpenAiFormat.transform_message(&message)["role"], "assistant");
    }

    #[test]
    fn test_build_request_omits_empty_tools() {
        let messages = vec![Message::user().with_text("hi")];
        let payload = OpenAiFormat.build_request("gpt-4o", &messages, &[]);
        assert_eq!(payload["model"], "gpt-4o");
        assert!(payload.get("tools").is_none());
    }

    #[tokio::test]
    async fn test_call_basic() -> ProviderResult<()> {
        let (_server, provider) =
            setup_mock_server(text_response("Hello! How can I assist you today?")).await;

        let messages = vec![Message::user().with_text("Hello?")];
        let text = provider.call(&messages).await?;

        assert_eq!(text, "Hello! How can I assist you today?");
        assert_eq!(provider.model(), "llama-3.3-70b-versatile");
        Ok(())
    }

    #[tokio::test]
    async fn test_call_with_tools_structured() -> ProviderResult<()> {
        let response_body = json!({
            "id": "chatcmpl-tool",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_123",
                        "type": "function",
                        "function": {
                            "name": "type_text",
                            "arguments": "{\"text\":\"hello world\"}"
                        }
                    }, {
                        "id": "call_124",
                        "type": "function",
                        "function": {
                            "name": "send_key",
                            "arguments": "{not json"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        });
        let (_server, provider) = setup_mock_server(response_body).await;

        let tool = ToolDefinition::new("type_text", "Type a specified text into the system.")
            .with_param("text", "Text to type");
        let messages = vec![Message::user().with_text("Type hello world")];

        let (text, calls) = provider.call_with_tools(&messages, &[tool]).await?;

        assert_eq!(text, None);
        assert_eq!(
            calls,
            vec![ToolCall::new("type_text", json!({"text": "hello world"}))]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_call_with_tools_sends_compiled_schema() -> ProviderResult<()> {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({
                "model": "gpt-4o",
                "tools": [{
                    "type": "function",
                    "function": {
                        "name": "click",
                        "parameters": {
                            "type": "object",
                            "properties": {"query": {"type": "string"}},
                            "required": ["query"]
                        }
                    }
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_response("ok")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = ProviderConfig::new(Vendor::OpenAi, "gpt-4o")
            .with_base_url(mock_server.uri())
            .with_api_key("test_api_key");
        let provider = ChatProvider::new(config, OpenAiFormat)?;

        let tool = ToolDefinition::new("click", "Click on a specified UI element.")
            .with_param("query", "Item or UI element on the screen to click");
        let (text, calls) = provider
            .call_with_tools(&[Message::user().with_text("click it")], &[tool])
            .await?;

        assert_eq!(text.as_deref(), Some("ok"));
        assert!(calls.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_vendor_error_field_is_raised() {
        let (_server, provider) = setup_mock_server(json!({
            "error": {"message": "model overloaded", "code": "overloaded"}
        }))
        .await;

        let result = provider.call(&[Message::user().with_text("Hello?")]).await;
        match result {
            Err(ProviderError::Api(message)) => assert!(message.contains("model overloaded")),
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_choices_is_raised() {
        let (_server, provider) = setup_mock_server(json!({"choices": []})).await;

        let result = provider.call(&[Message::user().with_text("Hello?")]).await;
        assert!(matches!(result, Err(ProviderError::EmptyResponse(_))));
    }

    #[tokio::test]
    async fn test_server_error() -> ProviderResult<()> {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .mount(&mock_server)
            .await;

        let config = ProviderConfig::new(Vendor::OpenAi, "gpt-4o")
            .with_base_url(mock_server.uri())
            .with_api_key("test_api_key");
        let provider = ChatProvider::new(config, OpenAiFormat)?;
        let result = provider.call(&[Message::user().with_text("Hello?")]).await;

        assert!(result.is_err());
        let message = result.unwrap_err().to_string();
        assert!(message.contains("500"));
        assert!(message.contains("upstream down"));
        Ok(())
    }
}
