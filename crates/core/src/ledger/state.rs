//! Persisted ledger record.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A memoized AI answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryCacheEntry {
    pub answer: String,
    /// Insertion time in milliseconds since the Unix epoch.
    pub inserted_at: i64,
    /// Tie-breaker for entries inserted within the same millisecond.
    #[serde(default)]
    pub seq: u64,
}

/// How often an article was opened versus shown in a feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewStats {
    pub views: u64,
    pub shown: u64,
}

/// Whole ledger record, persisted as one JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LedgerState {
    pub tokens: u64,
    pub total_earned: u64,
    pub total_spent: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Device-local date (`YYYY-MM-DD`) of the last applied refill.
    pub last_refill_date: Option<String>,
    pub query_cache: HashMap<String, QueryCacheEntry>,
    pub is_unlocked: bool,
    pub view_stats: HashMap<String, ViewStats>,
    pub offline_queue: Vec<String>,
    pub next_seq: u64,
}

impl LedgerState {
    /// Fresh record holding `tokens`.
    pub fn new(tokens: u64) -> Self {
        Self { tokens, ..Self::default() }
    }
}

impl Default for LedgerState {
    fn default() -> Self {
        Self {
            tokens: crate::config::LedgerConfig::default().initial_tokens,
            total_earned: 0,
            total_spent: 0,
            cache_hits: 0,
            cache_misses: 0,
            last_refill_date: None,
            query_cache: HashMap::new(),
            is_unlocked: false,
            view_stats: HashMap::new(),
            offline_queue: Vec::new(),
            next_seq: 0,
        }
    }
}
