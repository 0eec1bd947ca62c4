//! eco_status tool implementation.
//!
//! Reports the ledger balance and counters.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::state::AppState;

/// Output from the eco_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StatusOutput {
    pub tokens: u64,
    pub cap: u64,
    /// Subscribed callers are never charged.
    pub unlimited: bool,
    pub total_earned: u64,
    pub total_spent: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Share of paid queries answered from the memo, 0.0 to 1.0.
    pub hit_rate: f64,
    pub query_cache_entries: usize,
    pub is_unlocked: bool,
    pub last_refill_date: Option<String>,
}

/// Implementation of the eco_status tool.
pub async fn status_impl(state: &AppState) -> Result<CallToolResult, McpError> {
    let output = {
        let ledger = state.ledger();
        let snapshot = ledger.snapshot();
        StatusOutput {
            tokens: snapshot.tokens,
            cap: ledger.cap(),
            unlimited: ledger.is_unlimited(),
            total_earned: snapshot.total_earned,
            total_spent: snapshot.total_spent,
            cache_hits: snapshot.cache_hits,
            cache_misses: snapshot.cache_misses,
            hit_rate: ledger.hit_rate(),
            query_cache_entries: snapshot.query_cache.len(),
            is_unlocked: snapshot.is_unlocked,
            last_refill_date: snapshot.last_refill_date,
        }
    };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::state;
    use crate::tools::result_json;

    #[tokio::test]
    async fn test_status_fresh_ledger() {
        let (state, _network) = state().await;
        let result = status_impl(&state).await.unwrap();
        let json = result_json(&result);

        assert_eq!(json["tokens"], 30);
        assert_eq!(json["cap"], 100);
        assert_eq!(json["unlimited"], false);
        assert_eq!(json["hit_rate"], 0.0);
    }

    #[tokio::test]
    async fn test_status_reflects_spend() {
        let (state, _network) = state().await;
        state.ledger().spend("ask");

        let json = result_json(&status_impl(&state).await.unwrap());
        assert_eq!(json["tokens"], 27);
        assert_eq!(json["total_spent"], 3);
        assert_eq!(json["cache_misses"], 1);
    }
}
