//! MCP server handler
//!
//! Implements the MCP protocol handler for the random name tool.

use crate::config::ServerConfig;
use crate::error::mcp_mapper::map_tool_error;
use crate::tools::{self, ContentBlock, ToolOutput};
use rmcp::ErrorData as McpError;
use rmcp::handler::server::ServerHandler;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, InitializeResult,
    ListToolsResult, PaginatedRequestParam, ProtocolVersion, ServerCapabilities, Tool,
    ToolsCapability,
};
use rmcp::service::{RequestContext, RoleServer};
use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Random name MCP server handler
///
/// Stateless apart from its identity; the HTTP transport builds one per session.
#[derive(Debug, Clone)]
pub struct RandomNameHandler {
    /// Server name for MCP
    name: String,
    /// Server version
    version: String,
}

impl RandomNameHandler {
    /// Create a new handler from configuration
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            name: config.name.clone(),
            version: config.version.clone(),
        }
    }

    /// Get the number of exposed tools
    pub fn tool_count(&self) -> usize {
        tools::definitions().len()
    }

    /// Convert the tool catalog to MCP tool definitions
    pub fn mcp_tools(&self) -> Vec<Tool> {
        tools::definitions()
            .into_iter()
            .map(|tool| Tool {
                name: Cow::Borrowed(tool.name),
                description: Some(Cow::Borrowed(tool.description)),
                input_schema: Arc::new(tool.input_schema),
                annotations: None,
                icons: None,
                meta: None,
                output_schema: None,
                title: Some(tool.title.into()),
            })
            .collect()
    }

    /// Execute a tool call and convert the outcome to an MCP result
    pub fn execute_tool(
        &self,
        request: CallToolRequestParam,
    ) -> Result<CallToolResult, McpError> {
        tools::execute(&request.name, request.arguments)
            .map(to_mcp_result)
            .map_err(|e| {
                warn!(error = %e, "Tool call rejected");
                map_tool_error(&e)
            })
    }
}

/// Convert internal tool output to MCP result
fn to_mcp_result(output: ToolOutput) -> CallToolResult {
    let content = output
        .content
        .into_iter()
        .map(|block| match block {
            ContentBlock::Text { text } => Content::text(text),
        })
        .collect();

    CallToolResult {
        content,
        is_error: Some(false),
        meta: None,
        structured_content: None,
    }
}

impl ServerHandler for RandomNameHandler {
    fn get_info(&self) -> InitializeResult {
        InitializeResult {
            protocol_version: ProtocolVersion::default(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: Some(false),
                }),
                ..Default::default()
            },
            server_info: Implementation {
                name: self.name.clone(),
                version: self.version.clone(),
                icons: None,
                title: None,
                website_url: None,
            },
            instructions: Some(
                "Call get_random_name to receive a name picked at random from a fixed list"
                    .to_string(),
            ),
        }
    }

    #[instrument(skip(self, _context))]
    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        debug!("Listing tools");
        async move {
            Ok(ListToolsResult {
                tools: self.mcp_tools(),
                next_cursor: None,
                meta: None,
            })
        }
    }

    #[instrument(skip(self, _context), fields(tool = %request.name))]
    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        debug!(?request.arguments, "Calling tool");
        async move { self.execute_tool(request) }
    }
}
