//! Settings tools: eco_reset and eco_unlock.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use hypernews_core::Error;

use super::json_result;
use crate::state::AppState;

/// Output from the eco_reset tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResetOutput {
    /// Balance of the fresh ledger.
    pub tokens: u64,
}

/// Implementation of the eco_reset tool: the settings "clear" action.
pub async fn reset_impl(state: &AppState) -> Result<CallToolResult, McpError> {
    let tokens = {
        let mut ledger = state.ledger();
        ledger.reset();
        ledger.tokens()
    };
    json_result(&ResetOutput { tokens })
}

/// Parameters for the eco_unlock tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UnlockParams {
    pub code: String,
}

/// Output from the eco_unlock tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UnlockOutput {
    /// False when the unlock had already been redeemed.
    pub granted: bool,
    pub tokens: u64,
    pub cap: u64,
}

/// Implementation of the eco_unlock tool.
pub async fn unlock_impl(state: &AppState, params: UnlockParams) -> Result<CallToolResult, McpError> {
    let mut ledger = state.ledger();
    let Some(expected) = ledger.config().unlock_code.clone() else {
        return Err(Error::InvalidInput("unlock is disabled".into()).into());
    };
    if params.code.trim() != expected {
        return Err(Error::InvalidInput("unknown unlock code".into()).into());
    }

    let reward = ledger.config().unlock_reward;
    let granted = ledger.award_unlock(reward);
    let output = UnlockOutput { granted, tokens: ledger.tokens(), cap: ledger.cap() };
    drop(ledger);
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::{state, state_with};
    use crate::tools::result_json;
    use hypernews_core::LedgerConfig;

    #[tokio::test]
    async fn test_reset_restores_fresh_ledger() {
        let (state, _network) = state().await;
        state.ledger().spend("summarize");
        state.ledger().set_query_cache("t|q", "a");

        let json = result_json(&reset_impl(&state).await.unwrap());
        assert_eq!(json["tokens"], 30);

        let snapshot = state.ledger().snapshot();
        assert_eq!(snapshot.total_spent, 0);
        assert!(snapshot.query_cache.is_empty());
    }

    #[tokio::test]
    async fn test_unlock_once() {
        let config = LedgerConfig { unlock_code: Some("konami".into()), unlock_reward: 500, ..Default::default() };
        let (state, _network) = state_with(config).await;

        let params = UnlockParams { code: "konami".into() };
        let json = result_json(&unlock_impl(&state, params.clone()).await.unwrap());
        assert_eq!(json["granted"], true);
        assert_eq!(json["tokens"], 530);
        assert_eq!(json["cap"], 999_999);

        let again = result_json(&unlock_impl(&state, params).await.unwrap());
        assert_eq!(again["granted"], false);
        assert_eq!(again["tokens"], 530);
    }

    #[tokio::test]
    async fn test_unlock_wrong_code() {
        let config = LedgerConfig { unlock_code: Some("konami".into()), ..Default::default() };
        let (state, _network) = state_with(config).await;

        assert!(unlock_impl(&state, UnlockParams { code: "guess".into() }).await.is_err());
        assert!(!state.ledger().snapshot().is_unlocked);
    }

    #[tokio::test]
    async fn test_unlock_disabled_by_default() {
        let (state, _network) = state().await;
        let err = unlock_impl(&state, UnlockParams { code: "anything".into() }).await.unwrap_err();
        assert!(err.message.contains("disabled"));
    }
}
