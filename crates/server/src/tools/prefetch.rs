//! prefetch_categories tool implementation.
//!
//! Relays a prefetch message to the cache and waits for it to finish.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use hypernews_client::PrefetchReport;

use super::json_result;
use crate::state::AppState;

/// Parameters for the prefetch_categories tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PrefetchParams {
    /// Category ids to warm; an empty string warms the all-categories list.
    #[serde(default)]
    pub categories: Vec<String>,
}

/// Output from the prefetch_categories tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PrefetchOutput {
    /// Responses written to the API partition.
    pub stored: usize,
    /// Requests that failed or returned a non-success status.
    pub failed: usize,
    /// Entries in the API partition afterwards.
    pub api_entries: usize,
}

/// Implementation of the prefetch_categories tool.
pub async fn prefetch_impl(state: &AppState, params: PrefetchParams) -> Result<CallToolResult, McpError> {
    let worker = state.worker();
    let PrefetchReport { stored, failed } = worker.prefetch_categories(&params.categories).await?;
    let api_entries = worker.db().entry_count(&worker.partitions().api).await?;

    json_result(&PrefetchOutput { stored, failed, api_entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::{state, url};
    use crate::tools::result_json;

    #[tokio::test]
    async fn test_prefetch_tech_and_all() {
        let (state, network) = state().await;
        network.respond(&url("/api/articles?limit=30&category=tech"), 200, "application/json", "[]");
        network.respond(&url("/api/articles?limit=30"), 200, "application/json", "[]");
        network.respond(&url("/api/categories"), 200, "application/json", "[]");

        let params = PrefetchParams { categories: vec!["tech".into(), "".into()] };
        let json = result_json(&prefetch_impl(&state, params).await.unwrap());
        assert_eq!(json["stored"], 3);
        assert_eq!(json["failed"], 0);
        assert_eq!(json["api_entries"], 3);
    }

    #[tokio::test]
    async fn test_prefetch_offline_stores_nothing() {
        let (state, _network) = state().await;
        let params = PrefetchParams { categories: vec!["tech".into()] };
        let json = result_json(&prefetch_impl(&state, params).await.unwrap());
        assert_eq!(json["stored"], 0);
        assert_eq!(json["failed"], 2);
    }
}
