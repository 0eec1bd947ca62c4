//! page_fetch tool implementation.
//!
//! Issues a GET through the tiered cache, the way a page of the site would.
//! When the request opens an article, the ledger learns about it: a view
//! when content arrives, an offline miss when nothing could be served.
//! The first answer from the network settles queued offline misses.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use hypernews_client::{Request, ResponseSource};

use super::json_result;
use crate::state::AppState;

/// Parameters for the page_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PageFetchParams {
    /// Site path (`/api/articles?limit=30`) or absolute URL.
    pub path: String,
    /// Treat the request as a top-level page navigation (default: false).
    #[serde(default)]
    pub navigate: bool,
    /// Id of the article this request opens, if any.
    #[serde(default)]
    pub article_id: Option<String>,
}

/// Output from the page_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PageFetchOutput {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    /// `network`, `cache` or `synthetic`.
    pub source: String,
    pub body: String,
    /// Tokens credited for offline misses settled by this request.
    pub offline_credited: u64,
}

/// Implementation of the page_fetch tool.
pub async fn page_fetch_impl(state: &AppState, params: PageFetchParams) -> Result<CallToolResult, McpError> {
    let worker = state.worker();
    let url = worker.resolve(&params.path)?;
    let request = if params.navigate { Request::navigation(url.clone()) } else { Request::get(url.clone()) };
    let article_id = params.article_id.as_deref();

    let response = match worker.fetch(request).await {
        Ok(response) => response,
        Err(e) => {
            if let Some(id) = article_id {
                state.ledger().record_offline_miss(id);
            }
            return Err(e.into());
        }
    };

    let offline_credited = {
        let mut ledger = state.ledger();
        match (article_id, response.source) {
            (Some(id), ResponseSource::Synthetic) => ledger.record_offline_miss(id),
            (Some(id), _) if response.is_success() => ledger.record_view(id),
            _ => {}
        }
        if response.source == ResponseSource::Network { ledger.process_offline_queue() } else { 0 }
    };
    if offline_credited > 0 {
        tracing::info!(credited = offline_credited, "back online, settled offline misses");
    }

    let source = match response.source {
        ResponseSource::Network => "network",
        ResponseSource::Cache => "cache",
        ResponseSource::Synthetic => "synthetic",
    };

    json_result(&PageFetchOutput {
        url: url.to_string(),
        status: response.status,
        content_type: response.content_type.clone(),
        source: source.to_string(),
        body: response.text(),
        offline_credited,
    })
}
