//! Run settings: which vendor and model fills each model slot, loop limits
//! and the display to drive.
//!
//! Layered as built-in defaults, then an optional TOML file, then `CUA_*`
//! environment variables (`CUA_ACTION__MODEL=llama-3.2`). API keys are not
//! settings; they are read from each vendor's own variable.
use ::config::{Config, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::agent::AgentSettings;
use crate::errors::ProviderResult;
use crate::grounding::CoordinateSpace;
use crate::providers::configs::{ProviderConfig, Vendor};

pub const ENV_PREFIX: &str = "CUA";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required configuration: {env_var}")]
    MissingEnvVar { env_var: String },

    #[error("Configuration error: {0}")]
    Other(#[from] ::config::ConfigError),
}

/// Environment variable that sets a dotted settings key
pub fn to_env_var(field: &str) -> String {
    format!("{}_{}", ENV_PREFIX, field.replace('.', "__").to_uppercase())
}

/// One model slot
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelSettings {
    pub vendor: Vendor,
    pub model: String,
    /// Overrides the vendor's default endpoint
    #[serde(default)]
    pub base_url: Option<String>,
    /// Extra model nicknames for this slot, on top of the vendor's own
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

impl ModelSettings {
    /// Provider binding for this slot, with the key read from the vendor's variable
    pub fn provider_config(&self) -> ProviderResult<ProviderConfig> {
        let mut config = ProviderConfig::from_env(self.vendor, self.model.clone())?;
        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url.clone());
        }
        Ok(self
            .aliases
            .iter()
            .fold(config, |config, (alias, model)| config.with_alias(alias.clone(), model.clone())))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GroundingSettings {
    pub vendor: Vendor,
    pub model: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub aliases: HashMap<String, String>,
    #[serde(default)]
    pub space: CoordinateSpace,
}

impl GroundingSettings {
    pub fn model_settings(&self) -> ModelSettings {
        ModelSettings {
            vendor: self.vendor,
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            aliases: self.aliases.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SandboxSettings {
    #[serde(default = "default_display")]
    pub display: String,
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            display: default_display(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    pub vision: ModelSettings,
    pub action: ModelSettings,
    pub grounding: GroundingSettings,
    #[serde(default)]
    pub agent: AgentSettings,
    #[serde(default)]
    pub sandbox: SandboxSettings,
}

impl Settings {
    /// Load settings, reading `path` as TOML when given
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let defaults = AgentSettings::default();
        let mut builder = Config::builder()
            .set_default("vision.vendor", "openrouter")?
            .set_default("vision.model", "qwen-2.5-vl")?
            .set_default("action.vendor", "groq")?
            .set_default("action.model", "llama-3.3")?
            .set_default("grounding.vendor", "openrouter")?
            .set_default("grounding.model", "qwen-2.5-vl")?
            .set_default("grounding.space", "normalized1000")?
            .set_default("agent.max_iterations", defaults.max_iterations.unwrap_or(0))?
            .set_default("agent.keep_alive_secs", defaults.keep_alive_secs)?
            .set_default("sandbox.display", default_display())?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        match config.try_deserialize::<Self>() {
            Ok(mut settings) => {
                // zero means no cap
                if settings.agent.max_iterations == Some(0) {
                    settings.agent.max_iterations = None;
                }
                Ok(settings)
            }
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                let error_str = err.to_string();
                if error_str.starts_with("missing field") {
                    let field = error_str
                        .trim_start_matches("missing field `")
                        .trim_end_matches('`');
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else if let ::config::ConfigError::NotFound(field) = &err {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }
}

fn default_display() -> String {
    ":0".to_string()
}
