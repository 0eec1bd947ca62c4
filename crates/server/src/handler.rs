//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use crate::state::AppState;
use crate::tools::{
    AskParams, FeedShownParams, PageFetchParams, PrefetchParams, TtsParams, UnlockParams, ask_impl, feed_shown_impl,
    page_fetch_impl, prefetch_impl, reset_impl, status_impl, tts_impl, unlock_impl,
};

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

/// The main MCP server handler for hypernews-eco.
#[derive(Clone)]
pub struct EcoServer {
    state: AppState,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl EcoServer {
    /// Create a new server handler.
    pub fn new(state: AppState) -> Self {
        Self { state, tool_router: Self::tool_router() }
    }

    #[tool(description = "Show the token balance, cap, lifetime counters and answer-cache hit rate.")]
    async fn eco_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.state).await
    }

    /// Ask an AI question about an article.
    ///
    /// Repeated questions are answered from the local memo and earn tokens;
    /// new ones cost tokens, refunded if the backend call fails.
    #[tool(
        description = "Ask a question about an article. Memoized answers are free and earn tokens; new questions cost 3 tokens, refunded on failure."
    )]
    async fn eco_ask(&self, params: Parameters<AskParams>) -> Result<CallToolResult, McpError> {
        ask_impl(&self.state, params.0).await
    }

    #[tool(
        description = "GET a site path through the tiered offline cache. Returns status, content type, body and whether it came from network, cache or a synthetic fallback. Pass article_id when opening an article to record the view or an offline miss."
    )]
    async fn page_fetch(&self, params: Parameters<PageFetchParams>) -> Result<CallToolResult, McpError> {
        page_fetch_impl(&self.state, params.0).await
    }

    #[tool(
        description = "Warm the offline API cache with article lists for the given categories (empty string = all categories)."
    )]
    async fn prefetch_categories(&self, params: Parameters<PrefetchParams>) -> Result<CallToolResult, McpError> {
        prefetch_impl(&self.state, params.0).await
    }

    #[tool(
        description = "Record articles shown in a feed. Returns each article's view probability and whether it should stay cached."
    )]
    async fn eco_feed_shown(&self, params: Parameters<FeedShownParams>) -> Result<CallToolResult, McpError> {
        feed_shown_impl(&self.state, params.0).await
    }

    #[tool(description = "Clear the token ledger: balance, counters, answer cache and view stats start over.")]
    async fn eco_reset(&self) -> Result<CallToolResult, McpError> {
        reset_impl(&self.state).await
    }

    #[tool(description = "Redeem the one-time unlock code, raising the token cap and granting the unlock reward.")]
    async fn eco_unlock(&self, params: Parameters<UnlockParams>) -> Result<CallToolResult, McpError> {
        unlock_impl(&self.state, params.0).await
    }

    #[tool(description = "Synthesize speech for a voice and text. Cached clips are free; new clips cost 2 tokens.")]
    async fn tts_speech(&self, params: Parameters<TtsParams>) -> Result<CallToolResult, McpError> {
        tts_impl(&self.state, params.0).await
    }
}

impl ServerHandler for EcoServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "hypernews-eco".into(),
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
