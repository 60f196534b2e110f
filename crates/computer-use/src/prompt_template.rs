use serde::Serialize;
use tera::{Context, Error as TeraError, Tera};

use crate::models::tool::ToolDefinition;

pub const SYSTEM_PROMPT: &str = include_str!("prompts/system.md");
pub const PERCEPTION_PROMPT: &str = include_str!("prompts/perception.md");
pub const GROUNDING_PROMPT: &str = include_str!("prompts/grounding.md");

pub fn load_prompt<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    let mut tera = Tera::default();
    tera.add_raw_template("inline_template", template)?;
    let context = Context::from_serialize(context_data)?;
    let rendered = tera.render("inline_template", &context)?;
    Ok(rendered)
}

/// What the system prompt says about one capability group
#[derive(Clone, Debug, Serialize)]
pub struct SystemInfo {
    pub name: String,
    pub description: String,
    pub instructions: String,
}

impl SystemInfo {
    pub fn new(name: &str, description: &str, instructions: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            instructions: instructions.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ToolSummary<'a> {
    name: &'a str,
    signature: String,
    description: &'a str,
}

#[derive(Serialize)]
struct SystemContext<'a> {
    systems: &'a [SystemInfo],
    tools: Vec<ToolSummary<'a>>,
}

/// The system message describing each system and every action the model may take
pub fn system_prompt(systems: &[SystemInfo], tools: &[ToolDefinition]) -> Result<String, TeraError> {
    let context = SystemContext {
        systems,
        tools: tools
            .iter()
            .map(|tool| ToolSummary {
                name: &tool.name,
                signature: tool.signature(),
                description: &tool.description,
            })
            .collect(),
    };
    Ok(load_prompt(SYSTEM_PROMPT, &context)?.trim_end().to_string())
}

/// Asks the vision model to describe the screen against the objective
pub fn perception_prompt() -> &'static str {
    PERCEPTION_PROMPT.trim_end()
}

#[derive(Serialize)]
struct GroundingContext<'a> {
    query: &'a str,
}

/// Instruction sent next to the screenshot when locating an element
pub fn grounding_prompt(query: &str) -> Result<String, TeraError> {
    Ok(load_prompt(GROUNDING_PROMPT, &GroundingContext { query })?
        .trim_end()
        .to_string())
}
