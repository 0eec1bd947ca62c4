//! MCP tool implementations.
//!
//! This module contains all tools exposed by the hypernews-eco server.

pub mod ask;
pub mod feed;
pub mod page;
pub mod prefetch;
pub mod settings;
pub mod status;
pub mod tts;

pub use ask::{AskParams, ask_impl};
pub use feed::{FeedShownParams, feed_shown_impl};
pub use page::{PageFetchParams, page_fetch_impl};
pub use prefetch::{PrefetchParams, prefetch_impl};
pub use settings::{UnlockParams, reset_impl, unlock_impl};
pub use status::status_impl;
pub use tts::{TtsParams, tts_impl};

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use hypernews_core::Error;

/// Serialize a tool output as pretty JSON text content.
pub(crate) fn json_result(output: &impl Serialize) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) fn result_json(result: &CallToolResult) -> serde_json::Value {
    let text = result.content[0].as_text().map(|t| t.text.clone()).unwrap_or_default();
    serde_json::from_str(&text).unwrap()
}
