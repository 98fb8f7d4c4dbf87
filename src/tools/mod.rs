//! Tools module
//!
//! The tool catalog exposed over MCP and dispatch of tool calls by name.

pub mod random_name;

pub use random_name::{GetRandomNameArgs, RANDOM_NAMES, pick_random_name, random_name};

use crate::error::{ToolError, ToolResult};
use schemars::Schema;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

/// Static metadata describing one tool
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    /// Tool name
    pub name: &'static str,
    /// Human-readable title
    pub title: &'static str,
    /// Tool description
    pub description: &'static str,
    /// JSON Schema object for the tool's input
    pub input_schema: Map<String, Value>,
}

/// A content block in tool output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    /// Plain text content
    Text { text: String },
}

/// Output of a successful tool execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub content: Vec<ContentBlock>,
}

impl ToolOutput {
    /// Output consisting of a single text block
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }
}

/// All tools served by this server
pub fn definitions() -> Vec<ToolDefinition> {
    vec![ToolDefinition {
        name: random_name::TOOL_NAME,
        title: random_name::TOOL_TITLE,
        description: random_name::TOOL_DESCRIPTION,
        input_schema: object_schema(&schemars::schema_for!(GetRandomNameArgs)),
    }]
}

/// Execute a tool by name
pub fn execute(name: &str, arguments: Option<Map<String, Value>>) -> ToolResult<ToolOutput> {
    match name {
        random_name::TOOL_NAME => {
            let _args: GetRandomNameArgs = parse_arguments(arguments)?;
            let name = random_name();
            debug!(name, "Drew random name");
            Ok(ToolOutput::text(name))
        }
        other => Err(ToolError::NotFound(other.to_string())),
    }
}

/// Deserialize call arguments, treating absent arguments as `{}`
fn parse_arguments<T: DeserializeOwned>(arguments: Option<Map<String, Value>>) -> ToolResult<T> {
    let args = Value::Object(arguments.unwrap_or_default());
    serde_json::from_value(args)
        .map_err(|e| ToolError::InvalidArguments(format!("Failed to parse arguments: {}", e)))
}

/// Reduce a generated schema to the `{type, properties, required}` object MCP expects
fn object_schema(schema: &Schema) -> Map<String, Value> {
    let schema_value = serde_json::to_value(schema).unwrap_or_else(|_| serde_json::json!({}));

    let mut input_schema = Map::new();
    input_schema.insert("type".to_string(), Value::String("object".to_string()));
    input_schema.insert(
        "properties".to_string(),
        schema_value
            .get("properties")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new())),
    );
    if let Some(required) = schema_value.get("required") {
        input_schema.insert("required".to_string(), required.clone());
    }
    input_schema
}
