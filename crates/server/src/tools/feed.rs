//! eco_feed_shown tool implementation.
//!
//! Records that articles were shown in a feed and reports, per article,
//! whether it is opened often enough to keep cached.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::state::AppState;

/// Parameters for the eco_feed_shown tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FeedShownParams {
    /// Ids of the articles rendered in the feed.
    pub article_ids: Vec<String>,
}

/// Per-article verdict.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ArticleRetention {
    pub article_id: String,
    /// Views per impression, 0.0 to 1.0.
    pub view_probability: f64,
    pub keep_cache: bool,
}

/// Output from the eco_feed_shown tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FeedShownOutput {
    pub articles: Vec<ArticleRetention>,
}

/// Implementation of the eco_feed_shown tool.
pub async fn feed_shown_impl(state: &AppState, params: FeedShownParams) -> Result<CallToolResult, McpError> {
    let articles = {
        let mut ledger = state.ledger();
        params
            .article_ids
            .into_iter()
            .map(|article_id| {
                ledger.record_shown(&article_id);
                ArticleRetention {
                    view_probability: ledger.view_probability(&article_id),
                    keep_cache: ledger.should_keep_cache(&article_id),
                    article_id,
                }
            })
            .collect()
    };
    json_result(&FeedShownOutput { articles })
}
