//! Timing knobs for token expiry and notification cooldowns.

use chrono::Duration;

/// Lifetimes and windows used by the managers.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Lifetime of a freshly stored token (default: 1 hour).
    pub token_ttl: Duration,
    /// Period of the background expiry sweep (default: 5 minutes).
    pub sweep_interval: Duration,
    /// Remaining lifetime under which a token counts as expiring soon (default: 5 minutes).
    pub expiring_soon_window: Duration,
    /// Minimum gap between alerts for a product at unchanged stock (default: 1 hour).
    pub low_stock_cooldown: Duration,
    /// Suppression window after a stock notification is read (default: 24 hours).
    pub stock_read_window: Duration,
    /// Suppression window after a task notification is read (default: 12 hours).
    pub task_read_window: Duration,
    /// Age after which read-journal entries are dropped (default: 7 days).
    pub read_retention: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            token_ttl: Duration::hours(1),
            sweep_interval: Duration::minutes(5),
            expiring_soon_window: Duration::minutes(5),
            low_stock_cooldown: Duration::hours(1),
            stock_read_window: Duration::hours(24),
            task_read_window: Duration::hours(12),
            read_retention: Duration::days(7),
        }
    }
}
