//! eco_ask tool implementation.
//!
//! Paid AI question about an article, memoized in the ledger:
//! a memo hit earns tokens and skips the network; a miss spends tokens
//! up front and refunds them if the backend call fails.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use hypernews_client::{Request, Response};
use hypernews_core::{Error, ledger::feature_cost};

use super::json_result;
use crate::state::AppState;

const FEATURE: &str = "ask";

/// Parameters for the eco_ask tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AskParams {
    /// Article title.
    pub title: String,
    /// The question to ask about the article.
    pub question: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Output from the eco_ask tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AskOutput {
    pub answer: String,
    /// True when the answer came from the memo.
    pub cached: bool,
    /// Balance after the call.
    pub tokens: u64,
}

#[derive(Serialize)]
struct AskBody<'a> {
    title: &'a str,
    description: &'a str,
    source: &'a str,
    question: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
}

#[derive(Deserialize)]
struct AskAnswer {
    answer: String,
}

/// Implementation of the eco_ask tool.
pub async fn ask_impl(state: &AppState, params: AskParams) -> Result<CallToolResult, McpError> {
    if params.title.trim().is_empty() || params.question.trim().is_empty() {
        return Err(Error::InvalidInput("title and question must not be empty".into()).into());
    }

    let key = format!("{}|{}", params.title, params.question);

    {
        let mut ledger = state.ledger();
        if let Some(answer) = ledger.get_query_cache(&key) {
            ledger.earn_from_cache();
            return json_result(&AskOutput { answer, cached: true, tokens: ledger.tokens() });
        }
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

    match ask_backend(state, &params).await {
        Ok(answer) => {
            let mut ledger = state.ledger();
            ledger.set_query_cache(&key, &answer);
            json_result(&AskOutput { answer, cached: false, tokens: ledger.tokens() })
        }
        Err(e) => {
            state.ledger().refund(FEATURE);
            tracing::warn!(title = %params.title, error = %e, "ask failed, refunded");
            Err(e.into())
        }
    }
}

async fn ask_backend(state: &AppState, params: &AskParams) -> Result<String, Error> {
    let worker = state.worker();
    let url = worker.resolve(&format!("{}articles/ask", worker.config().api_prefix))?;
    let body = AskBody {
        title: &params.title,
        description: params.description.as_deref().unwrap_or_default(),
        source: params.source.as_deref().unwrap_or_default(),
        question: &params.question,
        url: params.url.as_deref(),
    };

    let response = worker.fetch(Request::post_json(url, &body)?).await?;
    answer_from(&response)
}

fn answer_from(response: &Response) -> Result<String, Error> {
    match response.status {
        402 => Err(Error::PaymentRequired("the backend refused the question".into())),
        status if !response.is_success() => Err(Error::HttpError(format!("ask failed with HTTP {status}"))),
        _ => {
            let parsed: AskAnswer = serde_json::from_slice(&response.body)
                .map_err(|e| Error::HttpError(format!("malformed answer: {e}")))?;
            Ok(parsed.answer)
        }
    }
}
