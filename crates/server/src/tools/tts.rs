//! tts_speech tool implementation.
//!
//! Cached clips are free. A network fill is charged the `tts` feature
//! cost and refunded if synthesis fails.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use hypernews_client::Response;
use hypernews_core::{Error, ledger::feature_cost};

use super::json_result;
use crate::state::AppState;

const FEATURE: &str = "tts";

/// Parameters for the tts_speech tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TtsParams {
    /// Voice id, e.g. `el:rachel` or `openai:nova`.
    pub voice: String,
    /// Text to speak.
    pub text: String,
}

/// Output from the tts_speech tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TtsOutput {
    pub content_type: Option<String>,
    pub bytes: usize,
    pub cached: bool,
    /// Balance after the call.
    pub tokens: u64,
}

/// Implementation of the tts_speech tool.
pub async fn tts_impl(state: &AppState, params: TtsParams) -> Result<CallToolResult, McpError> {
    let worker = state.worker();

    if let Some(clip) = worker.cached_speech(&params.voice, &params.text).await {
        return output(state, &clip, true);
    }

    {
        let mut ledger = state.ledger();
        if !ledger.can_afford(FEATURE) {
            return Err(Error::InsufficientTokens {
                feature: FEATURE.into(),
                cost: feature_cost(FEATURE),
                balance: ledger.tokens(),
            }
            .into());
        }
        ledger.spend(FEATURE);
    }

    match worker.synthesize_speech(&params.voice, &params.text).await {
        Ok(clip) => output(state, &clip, false),
        Err(e) => {
            state.ledger().refund(FEATURE);
            tracing::warn!(voice = %params.voice, error = %e, "speech synthesis failed, refunded");
            Err(e.into())
        }
    }
}

fn output(state: &AppState, clip: &Response, cached: bool) -> Result<CallToolResult, McpError> {
    json_result(&TtsOutput {
        content_type: clip.content_type.clone(),
        bytes: clip.body.len(),
        cached,
        tokens: state.ledger().tokens(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::{state, url};
    use crate::tools::result_json;

    fn params() -> TtsParams {
        TtsParams { voice: "el:rachel".into(), text: "Good morning".into() }
    }

    #[tokio::test]
    async fn test_fill_charges_then_cache_is_free() {
        let (state, network) = state().await;
        network.respond(&url("/api/tts"), 200, "audio/mpeg", vec![7u8; 32]);

        let first = result_json(&tts_impl(&state, params()).await.unwrap());
        assert_eq!(first["cached"], false);
        assert_eq!(first["bytes"], 32);
        assert_eq!(first["tokens"], 28);

        let second = result_json(&tts_impl(&state, params()).await.unwrap());
        assert_eq!(second["cached"], true);
        assert_eq!(second["tokens"], 28);
        assert_eq!(network.call_count(&url("/api/tts")), 1);
    }

    #[tokio::test]
    async fn test_payment_required_refunds() {
        let (state, network) = state().await;
        network.respond(&url("/api/tts"), 402, "application/json", "{}");

        let err = tts_impl(&state, params()).await.unwrap_err();
        assert!(err.message.starts_with("PAYMENT_REQUIRED"));
        assert_eq!(state.ledger().tokens(), 30);
    }
}
