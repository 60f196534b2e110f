use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use super::format::FormatKind;
use crate::errors::{ProviderError, ProviderResult};

/// Default request timeout for a single model call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Hosted model vendors the agent knows how to reach
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Vendor {
    Llama,
    OpenRouter,
    Fireworks,
    DeepSeek,
    OpenAi,
    Gemini,
    Anthropic,
    Groq,
    Mistral,
    Moonshot,
}

impl Vendor {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Vendor::Llama => "https://api.llama-api.com",
            Vendor::OpenRouter => "https://openrouter.ai/api/v1",
            Vendor::Fireworks => "https://api.fireworks.ai/inference/v1",
            Vendor::DeepSeek => "https://api.deepseek.com",
            Vendor::OpenAi => "https://api.openai.com/v1",
            Vendor::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
            Vendor::Anthropic => "https://api.anthropic.com/v1",
            Vendor::Groq => "https://api.groq.com/openai/v1",
            Vendor::Mistral => "https://api.mistral.ai/v1",
            Vendor::Moonshot => "https://api.moonshot.cn/v1",
        }
    }

    /// Environment variable holding the vendor's API key
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Vendor::Llama => "LLAMA_API_KEY",
            Vendor::OpenRouter => "OPENROUTER_API_KEY",
            Vendor::Fireworks => "FIREWORKS_API_KEY",
            Vendor::DeepSeek => "DEEPSEEK_API_KEY",
            Vendor::OpenAi => "OPENAI_API_KEY",
            Vendor::Gemini => "GEMINI_API_KEY",
            Vendor::Anthropic => "ANTHROPIC_API_KEY",
            Vendor::Groq => "GROQ_API_KEY",
            Vendor::Mistral => "MISTRAL_API_KEY",
            Vendor::Moonshot => "MOONSHOT_API_KEY",
        }
    }

    /// Short model nicknames and the vendor model ids they stand for
    pub fn aliases(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Vendor::Llama => &[
                ("llama-3.2", "llama-3.2-90b-vision"),
                ("llama-3.3", "llama-3.3-70b"),
            ],
            Vendor::OpenRouter => &[
                ("llama-3.2", "meta-llama/llama-3.2-90b-vision-instruct"),
                ("qwen-2.5-vl", "qwen/qwen2.5-vl-72b-instruct:free"),
            ],
            Vendor::Fireworks => &[
                ("llama-3.2", "accounts/fireworks/models/llama-v3p2-90b-vision-instruct"),
                ("llama-3.3", "accounts/fireworks/models/llama-v3p3-70b-instruct"),
            ],
            Vendor::Anthropic => &[
                ("claude-3.5-sonnet", "claude-3-5-sonnet-20241022"),
                ("claude-3.5-haiku", "claude-3-5-haiku-20241022"),
                ("claude-3-opus", "claude-3-opus-20240229"),
            ],
            Vendor::Groq => &[
                ("llama-3.2", "llama-3.2-90b-vision-preview"),
                ("llama-3.3", "llama-3.3-70b-versatile"),
            ],
            Vendor::Mistral => &[
                ("mistral", "mistral-large-latest"),
                ("pixtral", "pixtral-large-latest"),
            ],
            Vendor::Moonshot => &[
                ("moonshot-v1", "moonshot-v1-128k"),
                ("moonshot-v1-vision", "moonshot-v1-128k-vision-preview"),
            ],
            Vendor::DeepSeek | Vendor::OpenAi | Vendor::Gemini => &[],
        }
    }

    /// Wire format spoken by the vendor's endpoint
    pub fn format(&self) -> FormatKind {
        match self {
            Vendor::Anthropic => FormatKind::Anthropic,
            Vendor::Mistral => FormatKind::Mistral,
            _ => FormatKind::OpenAi,
        }
    }
}

/// Everything needed to reach one model on one vendor
#[derive(Clone)]
pub struct ProviderConfig {
    pub vendor: Vendor,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    /// Nickname to vendor model id; starts as the vendor's built-in table
    pub aliases: HashMap<String, String>,
    pub timeout: Duration,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("vendor", &self.vendor)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ProviderConfig {
    /// A config with the vendor's default base url and aliases, and no key
    pub fn new<S: Into<String>>(vendor: Vendor, model: S) -> Self {
        Self {
            vendor,
            base_url: vendor.default_base_url().to_string(),
            api_key: String::new(),
            model: model.into(),
            aliases: vendor
                .aliases()
                .iter()
                .map(|(alias, id)| (alias.to_string(), id.to_string()))
                .collect(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Read the API key from the vendor's environment variable
    pub fn from_env<S: Into<String>>(vendor: Vendor, model: S) -> ProviderResult<Self> {
        let env_var = vendor.api_key_env();
        let api_key = std::env::var(env_var)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ProviderError::Config(format!("No API key provided. Set {}", env_var))
            })?;
        Ok(Self::new(vendor, model).with_api_key(api_key))
    }

    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Add or replace one nickname
    pub fn with_alias<A: Into<String>, M: Into<String>>(mut self, alias: A, model: M) -> Self {
        self.aliases.insert(alias.into(), model.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The vendor model id, after alias resolution
    pub fn resolved_model(&self) -> &str {
        self.aliases
            .get(&self.model)
            .map(String::as_str)
            .unwrap_or(&self.model)
    }

    /// Fail fast on a config that can never make a successful call
    pub fn validate(&self) -> ProviderResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(ProviderError::Config("No base URL provided.".to_string()));
        }
        url::Url::parse(&self.base_url).map_err(|e| {
            ProviderError::Config(format!("Invalid base URL '{}': {}", self.base_url, e))
        })?;
        if self.api_key.trim().is_empty() {
            return Err(ProviderError::Config(format!(
                "No API key provided. Set {}",
                self.vendor.api_key_env()
            )));
        }
        Ok(())
    }

    /// Full url of an endpoint below the base url
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_aliases_resolve_and_unknown_names_pass_through() {
        let config = ProviderConfig::new(Vendor::Groq, "llama-3.3");
        assert_eq!(config.resolved_model(), "llama-3.3-70b-versatile");

        let config = ProviderConfig::new(Vendor::Groq, "mixtral-8x7b-32768");
        assert_eq!(config.resolved_model(), "mixtral-8x7b-32768");
    }

    #[test]
    fn test_with_alias_extends_and_overrides_table() {
        let config = ProviderConfig::new(Vendor::Groq, "fast")
            .with_alias("fast", "llama-3.1-8b-instant")
            .with_alias("llama-3.3", "llama-3.3-70b-specdec");
        assert_eq!(config.resolved_model(), "llama-3.1-8b-instant");
        assert_eq!(config.aliases["llama-3.3"], "llama-3.3-70b-specdec");
        assert_eq!(config.aliases["llama-3.2"], "llama-3.2-90b-vision-preview");
    }

    #[test]
    fn test_validate_requires_key_and_base_url() {
        let config = ProviderConfig::new(Vendor::OpenAi, "gpt-4o");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));

        let config = ProviderConfig::new(Vendor::OpenAi, "gpt-4o")
            .with_api_key("key")
            .with_base_url("");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("No base URL provided."));

        let config = ProviderConfig::new(Vendor::OpenAi, "gpt-4o")
            .with_api_key("key")
            .with_base_url("not a url");
        assert!(matches!(config.validate(), Err(ProviderError::Config(_))));

        let config = ProviderConfig::new(Vendor::OpenAi, "gpt-4o").with_api_key("key");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_endpoint_url_trims_trailing_slash() {
        let config = ProviderConfig::new(Vendor::Mistral, "mistral").with_base_url("http://localhost:8080/v1/");
        assert_eq!(
            config.endpoint_url("chat/completions"),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn test_vendor_names_round_trip() {
        for vendor in Vendor::iter() {
            let name = vendor.to_string();
            assert_eq!(Vendor::from_str(&name).unwrap(), vendor);
            let json = serde_json::to_value(vendor).unwrap();
            assert_eq!(json, serde_json::Value::String(name));
        }
        assert_eq!(Vendor::from_str("OpenRouter").unwrap(), Vendor::OpenRouter);
    }

    #[test]
    fn test_vendor_formats() {
        assert_eq!(Vendor::Anthropic.format(), FormatKind::Anthropic);
        assert_eq!(Vendor::Mistral.format(), FormatKind::Mistral);
        assert_eq!(Vendor::Groq.format(), FormatKind::OpenAi);
    }

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::remove_var("MOONSHOT_API_KEY");
        let err = ProviderConfig::from_env(Vendor::Moonshot, "moonshot-v1").unwrap_err();
        assert!(err.to_string().contains("MOONSHOT_API_KEY"));

        std::env::set_var("MOONSHOT_API_KEY", "sk-test");
        let config = ProviderConfig::from_env(Vendor::Moonshot, "moonshot-v1").unwrap();
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.base_url, "https://api.moonshot.cn/v1");
        assert_eq!(config.resolved_model(), "moonshot-v1-128k");

        std::env::remove_var("MOONSHOT_API_KEY");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = ProviderConfig::new(Vendor::OpenAi, "gpt-4o").with_api_key("sk-secret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
