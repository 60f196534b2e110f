use async_trait::async_trait;

use crate::errors::AgentResult;
use crate::models::tool::{ToolCall, ToolDefinition};

/// Core trait that defines a system that can be operated by an AI agent
#[async_trait]
pub trait System: Send + Sync {
    /// Get the name of the system
    fn name(&self) -> &str;

    /// Get the system description
    fn description(&self) -> &str;

    /// Get system instructions
    fn instructions(&self) -> &str;

    /// Get available tools, in registration order
    fn tools(&self) -> &[ToolDefinition];

    /// Call a tool, returning the observation text shown to the model
    async fn call(&self, tool_call: ToolCall) -> AgentResult<String>;
}
