//! Usage policies deciding whether token costs apply at all.

/// Decides whether a caller is exempt from token costs.
pub trait UsagePolicy: Send + Sync {
    fn is_unlimited(&self) -> bool;
}

/// Every paid feature costs tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct Metered;

impl UsagePolicy for Metered {
    fn is_unlimited(&self) -> bool {
        false
    }
}

/// Policy backed by the caller's subscription status.
#[derive(Debug, Clone, Copy)]
pub struct Subscription {
    pub active: bool,
}

impl UsagePolicy for Subscription {
    fn is_unlimited(&self) -> bool {
        self.active
    }
}
