use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by a tool while it runs. They never leave the dispatcher:
/// each one is turned into an observation the model can react to.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum AgentError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("{0}")]
    ExecutionError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AgentResult<T> = Result<T, AgentError>;

/// Errors from the model transport layer. Unlike tool errors these are not
/// absorbed by the agent loop.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider configuration error: {0}")]
    Config(String),

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request failed: {status} - {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Error calling model: {0}")]
    Api(String),

    #[error("Invalid response from model: {0}")]
    EmptyResponse(String),

    #[error("Invalid tool schema: {0}")]
    Schema(String),

    #[error("Malformed response body: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Reasons a run ends early with an error instead of an outcome.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Sandbox error: {0}")]
    Sandbox(#[source] anyhow::Error),

    #[error("Failed to render prompt: {0}")]
    Prompt(#[from] tera::Error),
}
