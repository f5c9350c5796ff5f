//! services/client/src/runtime.rs
//!
//! The long-lived owner of every background timer. The composition root
//! creates one `SessionRuntime` at startup and disposes it on teardown.

use std::time::Duration;

use godam_core::{InitOutcome, TokenManager};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::tasks::NotificationPoller;

pub struct SessionRuntime {
    tokens: TokenManager,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl SessionRuntime {
    /// Initialises the token manager and spawns the notification poller.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        tokens: TokenManager,
        poller: Option<NotificationPoller>,
        poll_interval: Duration,
    ) -> Self {
        let outcome = tokens.initialize();
        if outcome != InitOutcome::Started {
            warn!(?outcome, "Token expiry sweep is not running");
        }

        let cancel = CancellationToken::new();
        let mut tasks = Vec::new();
        if let Some(poller) = poller {
            tasks.push(tokio::spawn(poller.run(poll_interval, cancel.child_token())));
        }

        info!(background_tasks = tasks.len(), "Session runtime started");
        Self {
            tokens,
            cancel,
            tasks,
        }
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Cancels the expiry sweep, armed expiry timers and the poller, then waits
    /// for the spawned tasks to finish.
    pub async fn dispose(self) {
        self.tokens.dispose();
        self.cancel.cancel();
        for result in futures::future::join_all(self.tasks).await {
            if let Err(e) = result {
                warn!(error = %e, "Background task ended abnormally");
            }
        }
        info!("Session runtime disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MemoryStore, ShellNavigator, SystemClock};
    use async_trait::async_trait;
    use godam_core::domain::{IdentityClass, ProductSnapshot, TaskSnapshot};
    use godam_core::ports::{InventoryFeed, KeyValueStore, Navigator, PortResult};
    use godam_core::{NotificationManager, SessionSettings};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    struct EmptyFeed;

    #[async_trait]
    impl InventoryFeed for EmptyFeed {
        async fn fetch_products(&self) -> PortResult<Vec<ProductSnapshot>> {
            Ok(Vec::new())
        }

        async fn fetch_tasks(&self) -> PortResult<Vec<TaskSnapshot>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_stops_every_background_task() {
        let store = Arc::new(MemoryStore::new());
        let navigator = Arc::new(ShellNavigator::new("/dashboard"));
        let tokens = TokenManager::new(
            store.clone(),
            Arc::new(SystemClock),
            navigator.clone(),
            SessionSettings::default(),
        );
        let (tx, mut rx) = mpsc::channel(4);
        let poller = NotificationPoller::new(
            Arc::new(EmptyFeed),
            NotificationManager::new(store.clone(), Arc::new(SystemClock), SessionSettings::default()),
            Arc::new(SystemClock),
            10,
            tx,
        );

        let runtime = SessionRuntime::start(tokens.clone(), Some(poller), Duration::from_secs(300));
        tokens.store_token("abc", IdentityClass::Admin);
        runtime.dispose().await;

        // The poller owned the only sender; once it stops the channel closes.
        assert!(rx.recv().await.is_none());

        // The expiry timer was cancelled, so the token outlives its TTL.
        tokio::time::sleep(Duration::from_secs(7200)).await;
        assert_eq!(store.get("token").as_deref(), Some("abc"));
        assert_eq!(navigator.current_path(), "/dashboard");
    }
}
