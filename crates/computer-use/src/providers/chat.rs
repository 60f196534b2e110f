use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;

use super::base::Provider;
use super::configs::ProviderConfig;
use super::format::{ChatFormat, Completion};
use super::tool_parser::parse_tool_call;
use super::utils::elide_images;
use crate::errors::{ProviderError, ProviderResult};
use crate::models::message::Message;
use crate::models::tool::{ToolCall, ToolDefinition};

/// Drives any [`ChatFormat`] over HTTP: one POST per call, vendor error
/// detection, and the text fallback for tool calls.
pub struct ChatProvider<F: ChatFormat> {
    client: Client,
    config: ProviderConfig,
    format: F,
    model: String,
}

impl<F: ChatFormat> ChatProvider<F> {
    pub fn new(config: ProviderConfig, format: F) -> ProviderResult<Self> {
        config.validate()?;

        let client = Client::builder().timeout(config.timeout).build()?;
        let model = config.resolved_model().to_string();

        Ok(Self {
            client,
            config,
            format,
            model,
        })
    }

    pub fn format(&self) -> &F {
        &self.format
    }

    async fn post(&self, payload: Value) -> ProviderResult<Value> {
        let url = self.config.endpoint_url(self.format.endpoint());
        tracing::debug!(
            url = %url,
            payload = %elide_images(&payload),
            "Sending model request"
        );

        let request = self.client.post(&url).json(&payload);
        let response = self
            .format
            .authorize(request, &self.config.api_key)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let body: Value = response.json().await?;
                if let Some(error) = body.get("error").filter(|error| !error.is_null()) {
                    return Err(ProviderError::Api(error.to_string()));
                }
                Ok(body)
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(ProviderError::Status { status, body })
            }
        }
    }

    async fn complete(&self, messages: &[Message], tools: &[Value]) -> ProviderResult<Completion> {
        let payload = self.format.build_request(&self.model, messages, tools);
        let response = self.post(payload).await?;
        self.format.parse_response(&response)
    }
}

#[async_trait]
impl<F: ChatFormat> Provider for ChatProvider<F> {
    fn model(&self) -> &str {
        &self.model
    }

    async fn call(&self, messages: &[Message]) -> ProviderResult<String> {
        let completion = self.complete(messages, &[]).await?;
        Ok(completion.text.unwrap_or_default())
    }

    async fn call_with_tools(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> ProviderResult<(Option<String>, Vec<ToolCall>)> {
        let compiled = self.format.compile_tools(tools)?;
        let completion = self.complete(messages, &compiled).await?;

        if completion.has_structured_calls() {
            return Ok((completion.text, completion.tool_calls));
        }

        // Some models write the call into their text instead of the tool channel
        match completion.text {
            Some(text) if !text.trim().is_empty() => match parse_tool_call(&text) {
                Some(call) => {
                    tracing::debug!(tool = %call.name, "Recovered tool call from model text");
                    Ok((None, vec![call]))
                }
                None => Ok((Some(text), Vec::new())),
            },
            text => Ok((text, Vec::new())),
        }
    }
}
