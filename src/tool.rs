//! Tool system for agents
//!
//! Tools are the primary way agents interact with the external world. A tool
//! is declared with a name, a description, and a JSON schema for its
//! arguments; the [`ToolInvoker`] checks arguments against that schema before
//! the handler ever runs, and converts handler failures into error strings
//! the model can see.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Debug;
use std::sync::Arc;

use crate::error::{AgentError, Result};

/// Result from a tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The output from the tool
    pub output: Value,
    /// Error message if the tool failed
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(output: Value) -> Self {
        Self {
            output,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            output: Value::Null,
            error: Some(message.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Trait for all tools that can be used by agents
#[async_trait]
pub trait Tool: Send + Sync + Debug {
    /// Name of the tool, unique among a single agent's tools
    fn name(&self) -> &str;

    /// Description advertised to the model
    fn description(&self) -> &str;

    /// JSON schema for the tool's arguments
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with already-validated arguments
    async fn execute(&self, arguments: Value) -> Result<ToolResult>;
}

/// A function-based tool
#[derive(Clone)]
pub struct FunctionTool {
    name: String,
    description: String,
    parameters_schema: Value,
    function: Arc<dyn Fn(Value) -> Result<Value> + Send + Sync>,
}

impl std::fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters_schema", &self.parameters_schema)
            .finish()
    }
}

impl FunctionTool {
    /// Declare a tool from a name, description, argument schema, and handler.
    pub fn new<F>(name: String, description: String, parameters_schema: Value, function: F) -> Self
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name,
            description,
            parameters_schema,
            function: Arc::new(function),
        }
    }

    /// Declare a tool with a simple string-to-string handler.
    ///
    /// The argument schema is a single required `input` string.
    pub fn simple<F>(name: &str, description: &str, function: F) -> Self
    where
        F: Fn(String) -> String + Send + Sync + 'static,
    {
        let wrapped = move |args: Value| {
            let input = args
                .get("input")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            Ok(Value::String(function(input)))
        };

        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "input": {
                        "type": "string",
                        "description": "Input to the function"
                    }
                },
                "required": ["input"]
            }),
            function: Arc::new(wrapped),
        }
    }

    /// Declare a tool whose argument schema is derived from a typed struct.
    ///
    /// The handler receives the deserialized arguments; the schema comes from
    /// the struct's `JsonSchema` derive.
    pub fn typed<A, F>(name: &str, description: &str, function: F) -> Result<Self>
    where
        A: DeserializeOwned + JsonSchema,
        F: Fn(A) -> Result<Value> + Send + Sync + 'static,
    {
        let schema = serde_json::to_value(schemars::schema_for!(A))?;
        let tool_name = name.to_string();
        let wrapped = move |args: Value| {
            let typed: A = serde_json::from_value(args).map_err(|e| AgentError::Validation {
                tool: tool_name.clone(),
                reason: e.to_string(),
            })?;
            function(typed)
        };

        Ok(Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters_schema: schema,
            function: Arc::new(wrapped),
        })
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        self.parameters_schema.clone()
    }

    async fn execute(&self, arguments: Value) -> Result<ToolResult> {
        match (self.function)(arguments) {
            Ok(output) => Ok(ToolResult::success(output)),
            Err(e) => Ok(ToolResult::error(e.to_string())),
        }
    }
}

/// Macro to create a function tool from a plain closure
#[macro_export]
macro_rules! function_tool {
    ($name:expr, $description:expr, $func:expr) => {
        $crate::tool::FunctionTool::simple($name, $description, $func)
    };
}

/// Checks `args` against a declared JSON schema.
///
/// Covers the subset of JSON Schema that tool declarations here actually use:
/// the top-level object type, `required` fields, per-property primitive
/// types, and `enum` value lists.
pub fn validate_arguments(schema: &Value, args: &Value) -> std::result::Result<(), String> {
    if schema.get("type").and_then(|t| t.as_str()) == Some("object") && !args.is_object() {
        return Err("arguments must be an object".to_string());
    }

    if let Some(required) = schema.get("required").and_then(|v| v.as_array()) {
        for field in required {
            if let Some(name) = field.as_str() {
                if args.get(name).is_none() {
                    return Err(format!("missing required field: {}", name));
                }
            }
        }
    }

    if let Some(props) = schema.get("properties").and_then(|v| v.as_object()) {
        for (name, prop) in props {
            let Some(value) = args.get(name) else {
                continue;
            };

            if let Some(expected) = prop.get("type").and_then(|t| t.as_str()) {
                let matches = match expected {
                    "string" => value.is_string(),
                    "number" => value.is_number(),
                    "integer" => value.is_i64() || value.is_u64(),
                    "boolean" => value.is_boolean(),
                    "array" => value.is_array(),
                    "object" => value.is_object(),
                    "null" => value.is_null(),
                    _ => true,
                };
                if !matches {
                    return Err(format!("field '{}' must be of type {}", name, expected));
                }
            }

            if let Some(allowed) = prop.get("enum").and_then(|e| e.as_array()) {
                if !allowed.contains(value) {
                    return Err(format!("field '{}' has a value outside its enum", name));
                }
            }
        }
    }

    Ok(())
}

/// Validates and executes tool calls.
///
/// In strict mode (the default) a schema mismatch aborts the run before the
/// handler is called; in lenient mode the mismatch is returned as a
/// tool-error result the model can react to. Handler failures never abort
/// the run in either mode.
#[derive(Debug, Clone, Copy)]
pub struct ToolInvoker {
    strict: bool,
}

impl ToolInvoker {
    pub fn strict() -> Self {
        Self { strict: true }
    }

    pub fn lenient() -> Self {
        Self { strict: false }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub async fn invoke(&self, tool: &Arc<dyn Tool>, arguments: Value) -> Result<ToolResult> {
        if let Err(reason) = validate_arguments(&tool.parameters_schema(), &arguments) {
            if self.strict {
                return Err(AgentError::Validation {
                    tool: tool.name().to_string(),
                    reason,
                });
            }
            return Ok(ToolResult::error(format!(
                "schema validation failed: {}",
                reason
            )));
        }

        match tool.execute(arguments).await {
            Ok(result) => Ok(result),
            Err(e) => Ok(ToolResult::error(e.to_string())),
        }
    }
}

impl Default for ToolInvoker {
    fn default() -> Self {
        Self::strict()
    }
}
