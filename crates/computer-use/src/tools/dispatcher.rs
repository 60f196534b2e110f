use serde_json::Value;
use std::collections::HashMap;

use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{ToolCall, ToolDefinition};
use crate::prompt_template::SystemInfo;
use crate::tools::system::System;

pub const NOT_IMPLEMENTED: &str = "Function not implemented.";

/// Routes tool calls to the system that registered the tool. Every outcome,
/// including a failure, comes back as observation text.
pub struct ToolDispatcher {
    systems: Vec<Box<dyn System>>,
    index: HashMap<String, usize>,
}

impl ToolDispatcher {
    /// Index every tool by name. Two systems registering the same tool name
    /// is rejected.
    pub fn new(systems: Vec<Box<dyn System>>) -> AgentResult<Self> {
        let mut index = HashMap::new();
        for (position, system) in systems.iter().enumerate() {
            for tool in system.tools() {
                if index.insert(tool.name.clone(), position).is_some() {
                    return Err(AgentError::Internal(format!(
                        "Duplicate tool name: {}",
                        tool.name
                    )));
                }
            }
        }
        Ok(Self { systems, index })
    }

    /// All registered tools, systems in order and tools in registration order
    pub fn tools(&self) -> Vec<ToolDefinition> {
        self.systems
            .iter()
            .flat_map(|system| system.tools().iter().cloned())
            .collect()
    }

    pub fn system_info(&self) -> Vec<SystemInfo> {
        self.systems
            .iter()
            .map(|system| SystemInfo::new(system.name(), system.description(), system.instructions()))
            .collect()
    }

    /// Run a tool and describe the result. Never fails.
    pub async fn dispatch(&self, name: &str, arguments: Value) -> String {
        let name = name.to_lowercase();
        let Some(&position) = self.index.get(&name) else {
            tracing::warn!(tool = %name, "Tool is not registered");
            return NOT_IMPLEMENTED.to_string();
        };

        match self.systems[position].call(ToolCall::new(name.clone(), arguments)).await {
            Ok(observation) => observation,
            Err(AgentError::ToolNotFound(_)) => NOT_IMPLEMENTED.to_string(),
            Err(e) => {
                tracing::warn!(tool = %name, error = %e, "Tool failed");
                format!("Error executing function: {}", e)
            }
        }
    }
}
