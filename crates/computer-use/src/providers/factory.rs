use super::{
    anthropic::AnthropicFormat, base::Provider, chat::ChatProvider, configs::ProviderConfig,
    format::FormatKind, mistral::MistralFormat, openai::OpenAiFormat,
};
use crate::errors::ProviderResult;

/// Build the provider for a vendor binding, picking the wire format the
/// vendor speaks.
pub fn get_provider(config: ProviderConfig) -> ProviderResult<Box<dyn Provider>> {
    match config.vendor.format() {
        FormatKind::OpenAi => Ok(Box::new(ChatProvider::new(config, OpenAiFormat)?)),
        FormatKind::Anthropic => Ok(Box::new(ChatProvider::new(
            config,
            AnthropicFormat::default(),
        )?)),
        FormatKind::Mistral => Ok(Box::new(ChatProvider::new(
            config,
            MistralFormat::default(),
        )?)),
    }
}
