//! crates/godam_core/src/notifications.rs
//!
//! Local deduplication of recurring alerts. Two journals are kept in the
//! key-value store: the last low-stock alert per product, and the list of
//! notifications the user has read. They gate notification noise only; the
//! business state is always re-fetched from the backend.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::Duration;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::{keys, LowStockAlertRecord, NotificationCategory, ReadNotification};
use crate::ports::{Clock, KeyValueStore};
use crate::settings::SessionSettings;

type LowStockJournal = BTreeMap<String, LowStockAlertRecord>;

#[derive(Clone)]
pub struct NotificationManager {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    settings: Arc<SessionSettings>,
}

impl NotificationManager {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            store,
            clock,
            settings: Arc::new(settings),
        }
    }

    /// Decides whether a low-stock alert should be raised for `product_id`.
    ///
    /// True when nothing was recorded yet, the stock changed since the last
    /// alert, or the cooldown has elapsed. A true answer records the alert, so
    /// calling this commits to having alerted.
    pub fn should_create_low_stock_alert(&self, product_id: &str, current_stock: i64) -> bool {
        let now = self.clock.now().timestamp_millis();
        let cooldown = self.settings.low_stock_cooldown.num_milliseconds();
        let mut journal: LowStockJournal = self.load(keys::LOW_STOCK_ALERTS);

        let raise = match journal.get(product_id) {
            None => true,
            Some(last) if last.stock != current_stock => true,
            Some(last) => now.saturating_sub(last.timestamp) > cooldown,
        };
        debug!(product_id, current_stock, raise, "Low-stock alert decision");

        if raise {
            journal.insert(
                product_id.to_string(),
                LowStockAlertRecord {
                    stock: current_stock,
                    timestamp: now,
                },
            );
            self.save(keys::LOW_STOCK_ALERTS, &journal);
        }
        raise
    }

    /// True if a notification about `product_id` in `category` was read within 24 hours.
    pub fn was_recently_read(&self, product_id: &str, category: NotificationCategory) -> bool {
        self.read_within(self.settings.stock_read_window, |entry| {
            entry.category == category && entry.related_product.as_deref() == Some(product_id)
        })
    }

    /// True if a notification about the task titled `task_title` was read within 12 hours.
    pub fn was_task_recently_read(&self, task_title: &str, category: NotificationCategory) -> bool {
        self.read_within(self.settings.task_read_window, |entry| {
            entry.category == category && entry.task_title.as_deref() == Some(task_title)
        })
    }

    pub fn mark_as_read(
        &self,
        notification_id: &str,
        related_product: Option<&str>,
        category: NotificationCategory,
        task_title: Option<&str>,
    ) {
        let mut journal: Vec<ReadNotification> = self.load(keys::READ_NOTIFICATIONS);
        journal.push(ReadNotification {
            id: notification_id.to_string(),
            related_product: related_product.map(str::to_string),
            category,
            task_title: task_title.map(str::to_string),
            timestamp: self.clock.now().timestamp_millis(),
        });
        self.save(keys::READ_NOTIFICATIONS, &journal);
    }

    /// Drops read-journal entries older than the retention window. Returns how many.
    pub fn cleanup_old_read_notifications(&self) -> usize {
        let cutoff = self
            .clock
            .now()
            .timestamp_millis()
            .saturating_sub(self.settings.read_retention.num_milliseconds());
        let mut journal: Vec<ReadNotification> = self.load(keys::READ_NOTIFICATIONS);
        let before = journal.len();
        journal.retain(|entry| entry.timestamp >= cutoff);

        let removed = before - journal.len();
        if removed > 0 {
            self.save(keys::READ_NOTIFICATIONS, &journal);
            debug!(removed, "Pruned old read notifications");
        }
        removed
    }

    /// Forgets alert records of products that are no longer low on stock.
    pub fn cleanup_low_stock_alerts<S: AsRef<str>>(&self, current_low_stock_ids: &[S]) -> usize {
        let current: HashSet<&str> = current_low_stock_ids.iter().map(|id| id.as_ref()).collect();
        let mut journal: LowStockJournal = self.load(keys::LOW_STOCK_ALERTS);
        let before = journal.len();
        journal.retain(|product_id, _| current.contains(product_id.as_str()));

        let removed = before - journal.len();
        if removed > 0 {
            self.save(keys::LOW_STOCK_ALERTS, &journal);
            debug!(removed, "Forgot recovered products");
        }
        removed
    }

    fn read_within(&self, window: Duration, matches: impl Fn(&ReadNotification) -> bool) -> bool {
        let now = self.clock.now().timestamp_millis();
        let window = window.num_milliseconds();
        let journal: Vec<ReadNotification> = self.load(keys::READ_NOTIFICATIONS);
        journal
            .iter()
            .any(|entry| matches(entry) && now.saturating_sub(entry.timestamp) < window)
    }

    /// Reads a JSON journal; a missing or corrupt value reads as empty.
    fn load<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        let Some(raw) = self.store.get(key) else {
            return T::default();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(key, error = %e, "Discarding corrupt notification journal");
            T::default()
        })
    }

    fn save<T: Serialize>(&self, key: &str, value: &T) {
        let result = serde_json::to_string(value)
            .map_err(|e| e.to_string())
            .and_then(|json| self.store.set(key, &json).map_err(|e| e.to_string()));
        if let Err(error) = result {
            warn!(key, %error, "Failed to persist notification journal");
        }
    }
}
