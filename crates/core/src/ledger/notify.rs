//! Balance change notifications for the UI layer.

/// Receives every net balance change produced by a ledger operation.
pub trait BalanceObserver: Send + Sync {
    fn on_delta(&self, delta: i64, balance: u64);
}

/// Observer that only records the change in the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl BalanceObserver for TracingObserver {
    fn on_delta(&self, delta: i64, balance: u64) {
        tracing::debug!(delta, balance, "token balance changed");
    }
}

impl<O: BalanceObserver + ?Sized> BalanceObserver for std::sync::Arc<O> {
    fn on_delta(&self, delta: i64, balance: u64) {
        (**self).on_delta(delta, balance)
    }
}
