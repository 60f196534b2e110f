use async_trait::async_trait;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{AgentError, AgentResult};
use crate::grounding::{CoordinateSpace, GroundingResolver};
use crate::models::tool::{ToolCall, ToolDefinition};
use crate::sandbox::Sandbox;
use crate::tools::system::System;

pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);
pub const TYPING_GROUP_SIZE: usize = 50;
pub const TYPING_DELAY_MS: u64 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Click {
    Left,
    Double,
    Right,
}

impl Click {
    fn action(self) -> &'static str {
        match self {
            Click::Left => "click",
            Click::Double => "double click",
            Click::Right => "right click",
        }
    }
}

/// Shell, keyboard and mouse control of the sandbox desktop. Clicks are
/// aimed by grounding a description on a fresh screenshot.
pub struct ComputerSystem {
    tools: Vec<ToolDefinition>,
    sandbox: Arc<dyn Sandbox>,
    grounding: GroundingResolver,
}

impl ComputerSystem {
    pub fn new(sandbox: Arc<dyn Sandbox>, grounding: GroundingResolver) -> Self {
        let tools = vec![
            ToolDefinition::new("run_command", "Run a shell command and return the result.")
                .with_param("command", "Shell command to run synchronously"),
            ToolDefinition::new("run_background_command", "Run a shell command in the background.")
                .with_param("command", "Shell command to run asynchronously"),
            ToolDefinition::new("send_key", "Send a key or combination of keys to the system.")
                .with_param("name", "Key or combination (e.g. 'Return', 'Ctl-C')"),
            ToolDefinition::new("type_text", "Type a specified text into the system.")
                .with_param("text", "Text to type"),
            ToolDefinition::new("click", "Click on a specified UI element.")
                .with_param("query", "Item or UI element on the screen to click"),
            ToolDefinition::new("double_click", "Double click on a specified UI element.")
                .with_param("query", "Item or UI element on the screen to double click"),
            ToolDefinition::new("right_click", "Right click on a specified UI element.")
                .with_param("query", "Item or UI element on the screen to right click"),
        ];

        Self {
            tools,
            sandbox,
            grounding,
        }
    }

    async fn run_command(&self, command: &str) -> AgentResult<String> {
        let output = self
            .sandbox
            .run_command(command, COMMAND_TIMEOUT)
            .await
            .map_err(execution_error)?;
        Ok(output
            .combined()
            .unwrap_or_else(|| "The command finished running.".to_string()))
    }

    async fn run_background_command(&self, command: &str) -> AgentResult<String> {
        self.sandbox
            .run_background_command(command)
            .await
            .map_err(execution_error)?;
        Ok("The command has been started.".to_string())
    }

    async fn send_key(&self, name: &str) -> AgentResult<String> {
        self.sandbox.press_key(name).await.map_err(execution_error)?;
        Ok("The key has been pressed.".to_string())
    }

    async fn type_text(&self, text: &str) -> AgentResult<String> {
        self.sandbox
            .type_text(text, TYPING_GROUP_SIZE, TYPING_DELAY_MS)
            .await
            .map_err(execution_error)?;
        Ok("The text has been typed.".to_string())
    }

    async fn click(&self, query: &str, click: Click) -> AgentResult<String> {
        let screenshot = self.sandbox.screenshot().await.map_err(execution_error)?;

        let Some(position) = self
            .grounding
            .locate(&screenshot, query)
            .await
            .map_err(|e| AgentError::ExecutionError(e.to_string()))?
        else {
            return Ok(format!("Could not locate '{}' on the screen.", query));
        };

        let position = match self.grounding.space() {
            CoordinateSpace::Absolute => position,
            space => {
                let (width, height) = image_dimensions(&screenshot)?;
                position.rescale(space, width, height)
            }
        };
        tracing::info!(query = %query, x = position.x, y = position.y, action = click.action(), "Clicking");

        self.sandbox
            .move_mouse(position.x, position.y)
            .await
            .map_err(execution_error)?;
        match click {
            Click::Left => self.sandbox.left_click().await,
            Click::Double => self.sandbox.double_click().await,
            Click::Right => self.sandbox.right_click().await,
        }
        .map_err(execution_error)?;

        Ok(format!("The mouse has {}ed.", click.action()))
    }
}

fn execution_error(error: anyhow::Error) -> AgentError {
    AgentError::ExecutionError(error.to_string())
}

fn image_dimensions(screenshot: &[u8]) -> AgentResult<(u32, u32)> {
    image::ImageReader::new(Cursor::new(screenshot))
        .with_guessed_format()
        .map_err(|e| AgentError::ExecutionError(format!("Unreadable screenshot: {}", e)))?
        .into_dimensions()
        .map_err(|e| AgentError::ExecutionError(format!("Unreadable screenshot: {}", e)))
}

fn required_str<'a>(tool_call: &'a ToolCall, key: &str) -> AgentResult<&'a str> {
    tool_call.str_param(key).ok_or_else(|| {
        AgentError::InvalidParameters(format!("Missing '{}' parameter", key))
    })
}

#[async_trait]
impl System for ComputerSystem {
    fn name(&self) -> &str {
        "ComputerSystem"
    }

    fn description(&self) -> &str {
        "Control of a desktop computer through its shell, keyboard and mouse."
    }

    fn instructions(&self) -> &str {
        "Use shell commands when they are the quickest route. Describe click \
        targets the way they look on the screen, for example 'the Firefox icon \
        in the taskbar'."
    }

    fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    async fn call(&self, tool_call: ToolCall) -> AgentResult<String> {
        match tool_call.name.as_str() {
            "run_command" => self.run_command(required_str(&tool_call, "command")?).await,
            "run_background_command" => {
                self.run_background_command(required_str(&tool_call, "command")?)
                    .await
            }
            "send_key" => self.send_key(required_str(&tool_call, "name")?).await,
            "type_text" => self.type_text(required_str(&tool_call, "text")?).await,
            "click" => self.click(required_str(&tool_call, "query")?, Click::Left).await,
            "double_click" => {
                self.click(required_str(&tool_call, "query")?, Click::Double)
                    .await
            }
            "right_click" => {
                self.click(required_str(&tool_call, "query")?, Click::Right)
                    .await
            }
            _ => Err(AgentError::ToolNotFound(tool_call.name)),
        }
    }
}
