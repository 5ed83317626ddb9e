//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.

use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

use crate::state::AppState;
use crate::tools::deep_scan::{DeepScanParams, deep_scan_impl};
use crate::tools::page_open::{PageOpenParams, open_impl};
use crate::tools::quick_scan::{QuickScanParams, scan_impl};

/// The main MCP server handler for capsift.
#[derive(Clone)]
pub struct CapsiftServer {
    state: Arc<AppState>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl CapsiftServer {
    /// Create a new server handler over shared pipeline state.
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state, tool_router: Self::tool_router() }
    }

    /// Fetch a URL through the observed transport.
    ///
    /// HTML responses become the current page for quick_scan; JSON API
    /// responses feed the capture pipeline.
    #[tool(
        description = "Fetch a URL. HTML responses become the current page; qualifying JSON responses are mined for full-resolution image records."
    )]
    async fn page_open(&self, params: Parameters<PageOpenParams>) -> Result<CallToolResult, McpError> {
        open_impl(&self.state, params.0).await
    }

    /// Correlate a DOM snapshot against captured records.
    #[tool(
        description = "Scan page HTML for image assets, substituting captured full-resolution URLs where fingerprints match. Uses the last opened page when no html is given."
    )]
    async fn quick_scan(&self, params: Parameters<QuickScanParams>) -> Result<CallToolResult, McpError> {
        scan_impl(&self.state, params.0).await
    }

    /// Download everything the last quick scan found.
    #[tool(
        description = "Fetch every asset from the last quick_scan and save it to the download directory, converting to PNG where possible."
    )]
    async fn deep_scan(&self, params: Parameters<DeepScanParams>) -> Result<CallToolResult, McpError> {
        deep_scan_impl(&self.state, params.0).await
    }
}

impl ServerHandler for CapsiftServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "capsift".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
