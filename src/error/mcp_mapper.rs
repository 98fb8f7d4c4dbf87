//! MCP error code mapping.
//!
//! Maps tool errors to MCP protocol errors with JSON-RPC error codes.
//! Both an unknown tool name and malformed arguments are problems with the
//! request itself, so they surface as `Err(McpError)` with `-32602`.

use rmcp::ErrorData as McpError;
use rmcp::model::ErrorCode;
use serde_json::json;
use std::borrow::Cow;

use super::ToolError;

/// Maps a `ToolError` to an MCP protocol error.
pub fn map_tool_error(error: &ToolError) -> McpError {
    match error {
        ToolError::NotFound(name) => McpError {
            code: ErrorCode::INVALID_PARAMS,
            message: Cow::Owned(format!("Tool {} not found", name)),
            data: Some(json!({
                "tool": name,
                "error_type": "ToolNotFound"
            })),
        },

        ToolError::InvalidArguments(msg) => McpError {
            code: ErrorCode::INVALID_PARAMS,
            message: Cow::Owned(msg.clone()),
            data: Some(json!({
                "error_type": "InvalidArguments"
            })),
        },
    }
}
