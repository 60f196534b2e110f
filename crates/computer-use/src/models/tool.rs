use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// How a single tool parameter is described to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamSpec {
    /// A plain description, compiled to a required string parameter
    Description(String),
    /// A full JSON schema object, passed through verbatim
    Schema(Value),
}

impl From<&str> for ParamSpec {
    fn from(description: &str) -> Self {
        ParamSpec::Description(description.to_string())
    }
}

impl From<String> for ParamSpec {
    fn from(description: String) -> Self {
        ParamSpec::Description(description)
    }
}

impl From<Value> for ParamSpec {
    fn from(value: Value) -> Self {
        match value {
            Value::String(description) => ParamSpec::Description(description),
            schema => ParamSpec::Schema(schema),
        }
    }
}

/// A tool that can be used by a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The name of the tool, always lowercase
    pub name: String,
    /// A description of what the tool does
    pub description: String,
    /// Parameters in registration order
    pub parameters: Vec<(String, ParamSpec)>,
}

impl ToolDefinition {
    /// Create a new tool that takes no parameters
    pub fn new<N, D>(name: N, description: D) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        ToolDefinition {
            name: name.into().to_lowercase(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    /// Add a parameter, keeping the order in which parameters are added
    pub fn with_param<N, P>(mut self, name: N, spec: P) -> Self
    where
        N: Into<String>,
        P: Into<ParamSpec>,
    {
        self.parameters.push((name.into(), spec.into()));
        self
    }

    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|(name, _)| name.as_str())
    }

    /// JSON schema of the parameters. Every declared parameter is required.
    pub fn parameters_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for (name, spec) in &self.parameters {
            let property = match spec {
                ParamSpec::Description(description) => json!({
                    "type": "string",
                    "description": description,
                }),
                ParamSpec::Schema(schema) => schema.clone(),
            };
            properties.insert(name.clone(), property);
            required.push(Value::String(name.clone()));
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// `name(param, ...)` as shown to operators
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.param_names().collect::<Vec<_>>().join(", "))
    }
}

/// A tool call request that a system can execute
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// The name of the tool to execute
    pub name: String,
    /// The parameters for the execution, always a JSON object
    pub parameters: Value,
}

impl ToolCall {
    /// Create a new ToolCall, normalizing a null parameter container to `{}`
    pub fn new<S: Into<String>>(name: S, parameters: Value) -> Self {
        let parameters = match parameters {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        Self {
            name: name.into(),
            parameters,
        }
    }

    /// Look up a string argument
    pub fn str_param(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(|v| v.as_str())
    }

    /// The call as it is written back into the conversation
    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "parameters": self.parameters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_is_lowercased() {
        let tool = ToolDefinition::new("Run_Command", "Run a command");
        assert_eq!(tool.name, "run_command");
    }

    #[test]
    fn test_required_matches_registration_order() {
        let tool = ToolDefinition::new("drag", "Drag between two elements")
            .with_param("to", "Target element")
            .with_param("from", "Source element")
            .with_param("button", "Mouse button");

        let schema = tool.parameters_schema();
        assert_eq!(schema["required"], json!(["to", "from", "button"]));

        let keys: Vec<&String> = schema["properties"].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["to", "from", "button"]);
        assert_eq!(schema["properties"]["to"]["type"], "string");
        assert_eq!(schema["properties"]["to"]["description"], "Target element");
    }

    #[test]
    fn test_schema_params_pass_through() {
        let tool = ToolDefinition::new("scroll", "Scroll the screen")
            .with_param("amount", json!({"type": "integer", "description": "Lines"}))
            .with_param("direction", json!("up or down"));

        let schema = tool.parameters_schema();
        assert_eq!(
            schema["properties"]["amount"],
            json!({"type": "integer", "description": "Lines"})
        );
        assert_eq!(schema["properties"]["direction"]["type"], "string");
        assert_eq!(schema["required"], json!(["amount", "direction"]));
    }

    #[test]
    fn test_no_params_compiles_to_empty_object() {
        let schema = ToolDefinition::new("stop", "Done").parameters_schema();
        assert_eq!(
            schema,
            json!({"type": "object", "properties": {}, "required": []})
        );
    }

    #[test]
    fn test_signature() {
        let tool = ToolDefinition::new("send_key", "Send a key").with_param("name", "Key");
        assert_eq!(tool.signature(), "send_key(name)");
    }

    #[test]
    fn test_tool_call_normalizes_null_parameters() {
        let call = ToolCall::new("stop", Value::Null);
        assert_eq!(call.parameters, json!({}));
        assert_eq!(call.to_json(), json!({"name": "stop", "parameters": {}}));
    }
}
