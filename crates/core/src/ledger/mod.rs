//! Client-side token ledger and AI answer memo.
//!
//! The ledger gates paid AI features behind a spendable balance and
//! rewards reuse of memoized answers. Every mutation persists the whole
//! record immediately; persistence failures are logged and swallowed so
//! the in-memory balance keeps working for the rest of the session.
//!
//! Invariants:
//! - `tokens` never exceeds the current cap (100, or the unlocked cap)
//! - the query cache never holds more than `query_cache_max` entries,
//!   evicting oldest-inserted first
//! - the daily refill applies at most once per device-local calendar day

pub mod clock;
pub mod notify;
pub mod policy;
pub mod pricing;
pub mod state;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use notify::{BalanceObserver, TracingObserver};
pub use policy::{Metered, Subscription, UsagePolicy};
pub use pricing::feature_cost;
pub use state::{LedgerState, QueryCacheEntry, ViewStats};
pub use storage::{FileStore, KvStore, MemoryStore, StoreError};

use crate::config::LedgerConfig;

/// Storage key of the persisted ledger record.
pub const STORAGE_KEY: &str = "hn_eco";

/// Articles whose view probability falls below this lose their cache slot.
const KEEP_CACHE_THRESHOLD: f64 = 0.3;

/// Token balance, counters and answer memo for one device.
pub struct Ledger {
    state: LedgerState,
    config: LedgerConfig,
    store: Box<dyn KvStore>,
    policy: Box<dyn UsagePolicy>,
    clock: Box<dyn Clock>,
    observer: Box<dyn BalanceObserver>,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("state", &self.state)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Ledger {
    /// Load the ledger record from `store`, falling back to a fresh record.
    ///
    /// Uses the metered policy, the system clock and a tracing observer
    /// until replaced with the `with_*` builders.
    pub fn load(config: LedgerConfig, store: impl KvStore + 'static) -> Self {
        let state = match store.get(STORAGE_KEY) {
            Some(raw) => serde_json::from_str::<LedgerState>(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "corrupt ledger record, starting fresh");
                LedgerState::new(config.initial_tokens)
            }),
            None => LedgerState::new(config.initial_tokens),
        };

        let mut ledger = Self {
            state,
            config,
            store: Box::new(store),
            policy: Box::new(Metered),
            clock: Box::new(SystemClock),
            observer: Box::new(TracingObserver),
        };
        ledger.state.tokens = ledger.state.tokens.min(ledger.cap());
        ledger
    }

    pub fn with_policy(mut self, policy: impl UsagePolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_observer(mut self, observer: impl BalanceObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Current spendable balance.
    pub fn tokens(&self) -> u64 {
        self.state.tokens
    }

    /// Current balance cap.
    pub fn cap(&self) -> u64 {
        if self.state.is_unlocked { self.config.unlocked_max_tokens } else { self.config.max_tokens }
    }

    pub fn is_unlimited(&self) -> bool {
        self.policy.is_unlimited()
    }

    /// Read-only copy of the whole record.
    pub fn snapshot(&self) -> LedgerState {
        self.state.clone()
    }

    /// Share of paid lookups answered from the memo.
    pub fn hit_rate(&self) -> f64 {
        let total = self.state.cache_hits + self.state.cache_misses;
        if total == 0 { 0.0 } else { self.state.cache_hits as f64 / total as f64 }
    }

    /// Whether the balance covers `feature`. Unlimited callers always can.
    pub fn can_afford(&self, feature: &str) -> bool {
        self.policy.is_unlimited() || self.state.tokens >= feature_cost(feature)
    }

    /// Debit `feature`'s cost, flooring the balance at zero.
    ///
    /// Does not re-check affordability; callers check `can_afford` first.
    pub fn spend(&mut self, feature: &str) {
        if self.policy.is_unlimited() {
            return;
        }
        let cost = feature_cost(feature);
        let before = self.state.tokens;
        self.state.tokens = before.saturating_sub(cost);
        self.state.total_spent += cost;
        self.state.cache_misses += 1;
        tracing::debug!(feature, cost, tokens = self.state.tokens, "spent tokens");
        self.commit(before);
    }

    /// Undo a `spend` of `feature` after the paid call failed.
    ///
    /// The balance is clamped at the cap. An unmatched refund cannot push
    /// `total_spent` or `cache_misses` below zero; it is logged instead.
    pub fn refund(&mut self, feature: &str) {
        if self.policy.is_unlimited() {
            return;
        }
        let cost = feature_cost(feature);
        let before = self.state.tokens;
        self.credit(cost);
        if self.state.total_spent < cost || self.state.cache_misses == 0 {
            tracing::warn!(
                feature,
                total_spent = self.state.total_spent,
                cache_misses = self.state.cache_misses,
                "refund without matching spend"
            );
        }
        self.state.total_spent = self.state.total_spent.saturating_sub(cost);
        self.state.cache_misses = self.state.cache_misses.saturating_sub(1);
        self.commit(before);
    }

    /// Reward a memo hit.
    pub fn earn_from_cache(&mut self) {
        let before = self.state.tokens;
        let credited = self.credit(self.config.cache_hit_reward);
        self.state.total_earned += credited;
        self.state.cache_hits += 1;
        self.commit(before);
    }

    /// Memoized answer for `key`, if present and younger than the TTL.
    ///
    /// Expired entries are removed on the way. Hit/miss counters are left
    /// to `earn_from_cache` and `spend`.
    pub fn get_query_cache(&mut self, key: &str) -> Option<String> {
        let entry = self.state.query_cache.get(key)?;
        let age_ms = self.clock.now().timestamp_millis() - entry.inserted_at;
        if age_ms < self.config.query_cache_ttl().num_milliseconds() {
            return Some(entry.answer.clone());
        }

        self.state.query_cache.remove(key);
        tracing::debug!(key, age_ms, "expired query cache entry");
        self.persist();
        None
    }

    /// Memoize `answer` under `key`, evicting the oldest insertions past the bound.
    pub fn set_query_cache(&mut self, key: &str, answer: &str) {
        let seq = self.state.next_seq;
        self.state.next_seq += 1;
        self.state.query_cache.insert(
            key.to_string(),
            QueryCacheEntry { answer: answer.to_string(), inserted_at: self.clock.now().timestamp_millis(), seq },
        );

        let excess = self.state.query_cache.len().saturating_sub(self.config.query_cache_max);
        if excess > 0 {
            let mut order: Vec<(i64, u64, String)> = self
                .state
                .query_cache
                .iter()
                .map(|(k, e)| (e.inserted_at, e.seq, k.clone()))
                .collect();
            order.sort_unstable();
            for (_, _, k) in order.into_iter().take(excess) {
                self.state.query_cache.remove(&k);
            }
            tracing::debug!(evicted = excess, "trimmed query cache");
        }
        self.persist();
    }

    /// Number of memoized answers, expired ones included until looked up.
    pub fn query_cache_len(&self) -> usize {
        self.state.query_cache.len()
    }

    /// Apply the daily refill unless it already ran today.
    ///
    /// Returns whether the refill was applied.
    pub fn check_daily_refill(&mut self) -> bool {
        let today = self.clock.today().format("%Y-%m-%d").to_string();
        if self.state.last_refill_date.as_deref() == Some(today.as_str()) {
            return false;
        }

        let before = self.state.tokens;
        let credited = self.credit(self.config.daily_refill);
        tracing::info!(date = %today, credited, "daily token refill");
        self.state.last_refill_date = Some(today);
        self.commit(before);
        true
    }

    /// Switch to the unlocked cap and grant `amount` tokens.
    ///
    /// Only the first call has an effect; returns whether it did.
    pub fn award_unlock(&mut self, amount: u64) -> bool {
        if self.state.is_unlocked {
            tracing::debug!("unlock already granted");
            return false;
        }

        let before = self.state.tokens;
        self.state.is_unlocked = true;
        let credited = self.credit(amount);
        self.state.total_earned += credited;
        self.commit(before);
        true
    }

    /// Count an article being opened.
    pub fn record_view(&mut self, article_id: &str) {
        self.state.view_stats.entry(article_id.to_string()).or_default().views += 1;
        self.persist();
    }

    /// Count an article being shown in a feed.
    pub fn record_shown(&mut self, article_id: &str) {
        self.state.view_stats.entry(article_id.to_string()).or_default().shown += 1;
        self.persist();
    }

    /// Views per impression; 0.5 for articles never shown.
    pub fn view_probability(&self, article_id: &str) -> f64 {
        match self.state.view_stats.get(article_id) {
            Some(stats) if stats.shown > 0 => stats.views as f64 / stats.shown as f64,
            _ => 0.5,
        }
    }

    /// Whether an article is opened often enough to keep cached.
    pub fn should_keep_cache(&self, article_id: &str) -> bool {
        self.view_probability(article_id) >= KEEP_CACHE_THRESHOLD
    }

    /// Remember an article the user opened offline but had no cache for.
    pub fn record_offline_miss(&mut self, article_id: &str) {
        if !self.state.offline_queue.iter().any(|id| id == article_id) {
            self.state.offline_queue.push(article_id.to_string());
            self.persist();
        }
    }

    /// Settle the offline miss queue once connectivity is back.
    ///
    /// Grants one token per queued article and boosts their view stats so
    /// they are kept cached next time. Returns the tokens credited.
    pub fn process_offline_queue(&mut self) -> u64 {
        if self.state.offline_queue.is_empty() {
            return 0;
        }

        let queue = std::mem::take(&mut self.state.offline_queue);
        let before = self.state.tokens;
        let credited = self.credit(queue.len() as u64);
        self.state.total_earned += credited;
        for id in queue {
            let stats = self.state.view_stats.entry(id).or_default();
            stats.views += 3;
            stats.shown += 1;
        }
        self.commit(before);
        credited
    }

    /// Drop everything and start over from a fresh record.
    pub fn reset(&mut self) {
        let before = self.state.tokens;
        self.state = LedgerState::new(self.config.initial_tokens);
        tracing::info!("ledger reset");
        self.commit(before);
    }

    /// Add up to `amount` tokens without crossing the cap; returns what was added.
    fn credit(&mut self, amount: u64) -> u64 {
        let room = self.cap().saturating_sub(self.state.tokens);
        let credited = amount.min(room);
        self.state.tokens += credited;
        credited
    }

    fn commit(&mut self, tokens_before: u64) {
        self.persist();
        let delta = self.state.tokens as i64 - tokens_before as i64;
        if delta != 0 {
            self.observer.on_delta(delta, self.state.tokens);
        }
    }

    fn persist(&self) {
        let raw = match serde_json::to_string(&self.state) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode ledger record");
                return;
            }
        };
        if let Err(e) = self.store.set(STORAGE_KEY, &raw) {
            tracing::warn!(error = %e, "failed to persist ledger record");
        }
    }
}
