//! services/client/src/tasks/notification_poll.rs
//!
//! The background worker that turns fresh inventory state into alerts. It is
//! the only owner of the low-stock and task-completion poll, so each product's
//! alert cooldown advances at most once per cycle.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use godam_core::domain::{Alert, AlertKind, NotificationCategory, ProductSnapshot, TaskSnapshot};
use godam_core::ports::{Clock, InventoryFeed, PortError, PortResult};
use godam_core::NotificationManager;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub struct NotificationPoller {
    feed: Arc<dyn InventoryFeed>,
    notifications: NotificationManager,
    clock: Arc<dyn Clock>,
    low_stock_threshold: i64,
    alerts: mpsc::Sender<Alert>,
    /// Completed tasks already surfaced by this poller. Pruned to the
    /// currently completed set after every task scan.
    announced_tasks: HashSet<String>,
}

impl NotificationPoller {
    pub fn new(
        feed: Arc<dyn InventoryFeed>,
        notifications: NotificationManager,
        clock: Arc<dyn Clock>,
        low_stock_threshold: i64,
        alerts: mpsc::Sender<Alert>,
    ) -> Self {
        Self {
            feed,
            notifications,
            clock,
            low_stock_threshold,
            alerts,
            announced_tasks: HashSet::new(),
        }
    }

    /// Runs a single scan and returns how many alerts were published.
    ///
    /// Products and tasks are fetched independently; a failure of one does not
    /// skip the other, and read-journal housekeeping always runs. The first
    /// feed error is returned once the cycle is complete.
    pub async fn poll_once(&mut self) -> PortResult<usize> {
        let mut published = 0;
        let mut failure = None;

        // --- 1. Low stock ---
        match self.feed.fetch_products().await {
            Ok(products) => published += self.scan_products(&products).await,
            Err(e) => {
                log_feed_error("products", &e);
                failure.get_or_insert(e);
            }
        }

        // --- 2. Completed tasks ---
        match self.feed.fetch_tasks().await {
            Ok(tasks) => published += self.scan_tasks(tasks).await,
            Err(e) => {
                log_feed_error("tasks", &e);
                failure.get_or_insert(e);
            }
        }

        // --- 3. Housekeeping ---
        self.notifications.cleanup_old_read_notifications();

        match failure {
            Some(e) => Err(e),
            None => Ok(published),
        }
    }

    async fn scan_products(&self, products: &[ProductSnapshot]) -> usize {
        let low_stock: Vec<&ProductSnapshot> = products
            .iter()
            .filter(|product| product.is_low_stock(self.low_stock_threshold))
            .collect();

        let mut published = 0;
        for product in &low_stock {
            if self
                .notifications
                .was_recently_read(&product.id, NotificationCategory::Stock)
            {
                continue;
            }
            if self
                .notifications
                .should_create_low_stock_alert(&product.id, product.stock)
            {
                let kind = AlertKind::LowStock {
                    product_id: product.id.clone(),
                    name: product.name.clone(),
                    stock: product.stock,
                };
                self.publish(kind).await;
                published += 1;
            }
        }

        let low_stock_ids: Vec<&str> = low_stock.iter().map(|p| p.id.as_str()).collect();
        self.notifications.cleanup_low_stock_alerts(&low_stock_ids);
        published
    }

    async fn scan_tasks(&mut self, tasks: Vec<TaskSnapshot>) -> usize {
        let completed: Vec<TaskSnapshot> =
            tasks.into_iter().filter(|task| task.is_completed()).collect();
        let completed_ids: HashSet<&str> = completed.iter().map(|t| t.id.as_str()).collect();
        self.announced_tasks
            .retain(|id| completed_ids.contains(id.as_str()));

        let mut published = 0;
        for task in &completed {
            if self.announced_tasks.contains(&task.id)
                || self
                    .notifications
                    .was_task_recently_read(&task.title, NotificationCategory::Task)
            {
                continue;
            }
            self.announced_tasks.insert(task.id.clone());
            self.publish(AlertKind::TaskCompleted {
                task_id: task.id.clone(),
                title: task.title.clone(),
            })
            .await;
            published += 1;
        }
        published
    }

    /// Polls every `period` until `cancel` fires. A poll in flight is abandoned on cancel.
    pub async fn run(mut self, period: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(period_secs = period.as_secs(), "Notification poller started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        result = self.poll_once() => match result {
                            Ok(published) => debug!(published, "Notification poll complete"),
                            Err(PortError::Unauthorized) => {
                                warn!("Notification poll skipped: no valid session")
                            }
                            Err(e) => debug!(error = %e, "Notification poll incomplete"),
                        },
                    }
                }
            }
        }

        info!("Notification poller stopped");
    }

    async fn publish(&self, kind: AlertKind) {
        let alert = Alert::new(kind, self.clock.now());
        if self.alerts.send(alert).await.is_err() {
            debug!("Alert receiver dropped; alert discarded");
        }
    }
}

fn log_feed_error(feed: &str, e: &PortError) {
    match e {
        PortError::Unauthorized => debug!(feed, "Feed skipped: no valid session"),
        other => error!(feed, error = %other, "Feed fetch failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MemoryStore, SystemClock};
    use async_trait::async_trait;
    use godam_core::ports::KeyValueStore;
    use godam_core::SessionSettings;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeFeed {
        products: Mutex<Vec<ProductSnapshot>>,
        tasks: Mutex<Vec<TaskSnapshot>>,
        unauthorized: bool,
        products_down: bool,
    }

    impl FakeFeed {
        fn set_stock(&self, id: &str, stock: i64) {
            let mut products = self.products.lock().unwrap();
            match products.iter_mut().find(|p| p.id == id) {
                Some(product) => product.stock = stock,
                None => products.push(ProductSnapshot {
                    id: id.to_string(),
                    name: format!("Product {id}"),
                    stock,
                    min_stock: None,
                }),
            }
        }

        fn add_task(&self, id: &str, title: &str, status: &str) {
            self.tasks.lock().unwrap().push(TaskSnapshot {
                id: id.to_string(),
                title: title.to_string(),
                status: status.to_string(),
            });
        }

        fn set_task_status(&self, id: &str, status: &str) {
            let mut tasks = self.tasks.lock().unwrap();
            if let Some(task) = tasks.iter_mut().find(|t| t.id == id) {
                task.status = status.to_string();
            }
        }
    }

    #[async_trait]
    impl InventoryFeed for FakeFeed {
        async fn fetch_products(&self) -> PortResult<Vec<ProductSnapshot>> {
            if self.unauthorized {
                return Err(PortError::Unauthorized);
            }
            if self.products_down {
                return Err(PortError::Unexpected("HTTP error! status: 502".into()));
            }
            Ok(self.products.lock().unwrap().clone())
        }

        async fn fetch_tasks(&self) -> PortResult<Vec<TaskSnapshot>> {
            if self.unauthorized {
                return Err(PortError::Unauthorized);
            }
            Ok(self.tasks.lock().unwrap().clone())
        }
    }

    struct Fixture {
        feed: Arc<FakeFeed>,
        store: Arc<MemoryStore>,
        notifications: NotificationManager,
        poller: NotificationPoller,
        alerts: mpsc::Receiver<Alert>,
    }

    fn fixture(feed: FakeFeed) -> Fixture {
        let feed = Arc::new(feed);
        let store = Arc::new(MemoryStore::new());
        let notifications = NotificationManager::new(
            store.clone(),
            Arc::new(SystemClock),
            SessionSettings::default(),
        );
        let (tx, rx) = mpsc::channel(16);
        let poller = NotificationPoller::new(
            feed.clone(),
            notifications.clone(),
            Arc::new(SystemClock),
            10,
            tx,
        );
        Fixture {
            feed,
            store,
            notifications,
            poller,
            alerts: rx,
        }
    }

    fn drain(rx: &mut mpsc::Receiver<Alert>) -> Vec<AlertKind> {
        let mut kinds = Vec::new();
        while let Ok(alert) = rx.try_recv() {
            kinds.push(alert.kind);
        }
        kinds
    }

    #[tokio::test]
    async fn repeated_polls_do_not_repeat_alerts() {
        let mut f = fixture(FakeFeed::default());
        f.feed.set_stock("p1", 3);
        f.feed.set_stock("p2", 50);
        f.feed.add_task("t1", "Count pallets", "Completed");
        f.feed.add_task("t2", "Sweep aisle", "in-progress");

        assert_eq!(f.poller.poll_once().await.unwrap(), 2);
        let kinds = drain(&mut f.alerts);
        assert!(kinds.contains(&AlertKind::LowStock {
            product_id: "p1".into(),
            name: "Product p1".into(),
            stock: 3,
        }));
        assert!(kinds.contains(&AlertKind::TaskCompleted {
            task_id: "t1".into(),
            title: "Count pallets".into(),
        }));

        assert_eq!(f.poller.poll_once().await.unwrap(), 0);
        assert!(drain(&mut f.alerts).is_empty());
    }

    #[tokio::test]
    async fn stock_change_raises_a_fresh_alert() {
        let mut f = fixture(FakeFeed::default());
        f.feed.set_stock("p1", 3);
        f.poller.poll_once().await.unwrap();

        f.feed.set_stock("p1", 2);
        assert_eq!(f.poller.poll_once().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn recovered_products_alert_again_on_the_next_dip() {
        let mut f = fixture(FakeFeed::default());
        f.feed.set_stock("p1", 3);
        f.poller.poll_once().await.unwrap();

        f.feed.set_stock("p1", 40);
        assert_eq!(f.poller.poll_once().await.unwrap(), 0);

        f.feed.set_stock("p1", 3);
        assert_eq!(f.poller.poll_once().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn read_notifications_suppress_alerts() {
        let mut f = fixture(FakeFeed::default());
        f.notifications
            .mark_as_read("n1", Some("p1"), NotificationCategory::Stock, None);
        f.notifications
            .mark_as_read("n2", None, NotificationCategory::Task, Some("Count pallets"));
        f.feed.set_stock("p1", 3);
        f.feed.add_task("t1", "Count pallets", "done");

        assert_eq!(f.poller.poll_once().await.unwrap(), 0);
        assert!(drain(&mut f.alerts).is_empty());
    }

    #[tokio::test]
    async fn unauthorized_feed_aborts_the_cycle() {
        let mut f = fixture(FakeFeed {
            unauthorized: true,
            ..FakeFeed::default()
        });
        f.feed.add_task("t1", "Count pallets", "completed");

        assert!(matches!(
            f.poller.poll_once().await,
            Err(PortError::Unauthorized)
        ));
        assert!(drain(&mut f.alerts).is_empty());
    }

    #[tokio::test]
    async fn tasks_that_leave_the_completed_set_are_forgotten() {
        let mut f = fixture(FakeFeed::default());
        f.feed.add_task("t1", "Count pallets", "completed");
        assert_eq!(f.poller.poll_once().await.unwrap(), 1);
        assert!(f.poller.announced_tasks.contains("t1"));

        f.feed.set_task_status("t1", "in-progress");
        assert_eq!(f.poller.poll_once().await.unwrap(), 0);
        assert!(f.poller.announced_tasks.is_empty());

        f.feed.set_task_status("t1", "done");
        assert_eq!(f.poller.poll_once().await.unwrap(), 1);
        assert_eq!(
            drain(&mut f.alerts),
            vec![
                AlertKind::TaskCompleted {
                    task_id: "t1".into(),
                    title: "Count pallets".into(),
                };
                2
            ]
        );
    }

    #[tokio::test]
    async fn product_outage_does_not_skip_tasks_or_housekeeping() {
        let mut f = fixture(FakeFeed {
            products_down: true,
            ..FakeFeed::default()
        });
        f.feed.add_task("t1", "Count pallets", "completed");
        f.store
            .set(
                "readNotifications",
                r#"[{"id":"old","category":"stock","relatedProduct":"p9","timestamp":0}]"#,
            )
            .unwrap();

        assert!(matches!(
            f.poller.poll_once().await,
            Err(PortError::Unexpected(_))
        ));
        assert_eq!(
            drain(&mut f.alerts),
            vec![AlertKind::TaskCompleted {
                task_id: "t1".into(),
                title: "Count pallets".into(),
            }]
        );
        assert_eq!(f.store.get("readNotifications").as_deref(), Some("[]"));
    }

    #[tokio::test(start_paused = true)]
    async fn run_stops_when_cancelled() {
        let f = fixture(FakeFeed::default());
        f.feed.set_stock("p1", 1);
        let mut alerts = f.alerts;
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(f.poller.run(Duration::from_secs(300), cancel.clone()));
        let first = alerts.recv().await.unwrap();
        assert_eq!(first.category(), NotificationCategory::Stock);

        cancel.cancel();
        handle.await.unwrap();
    }
}
