//! crates/godam_core/src/token.rs
//!
//! The token manager: single source of truth for whether an identity class is
//! signed in. Tokens live in the key-value store next to their expiry instant;
//! validity is enforced lazily on every read, by a one-shot timer armed when a
//! token is stored, and by a recurring sweep installed by `initialize`.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration as StdDuration;

use chrono::{DateTime, TimeZone, Utc};
use tokio::runtime::Handle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::{
    is_login_route, keys, AdminProfile, EmployeeProfile, IdentityClass, SessionRecord,
};
use crate::ports::{Clock, KeyValueStore, Navigator};
use crate::settings::SessionSettings;

const FALLBACK_SWEEP_INTERVAL: StdDuration = StdDuration::from_secs(300);

/// Result of `TokenManager::initialize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// Cleanup ran and the recurring sweep is installed.
    Started,
    /// A previous call already initialised this manager; nothing was done.
    AlreadyInitialized,
    /// The store cannot be used in this context; nothing was scheduled.
    StorageUnavailable,
    /// Cleanup ran once, but there is no async runtime to host the sweep.
    NoRuntime,
}

//=========================================================================================
// The Main Manager Struct
//=========================================================================================

/// Stores, reads and expires bearer tokens for both identity classes.
///
/// Cloning is cheap and every clone shares the same timers and shutdown signal.
#[derive(Clone)]
pub struct TokenManager {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    navigator: Arc<dyn Navigator>,
    settings: Arc<SessionSettings>,
    timers: Arc<Mutex<HashMap<IdentityClass, CancellationToken>>>,
    initialized: Arc<AtomicBool>,
    shutdown: CancellationToken,
}

impl TokenManager {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        navigator: Arc<dyn Navigator>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            store,
            clock,
            navigator,
            settings: Arc::new(settings),
            timers: Arc::new(Mutex::new(HashMap::new())),
            initialized: Arc::new(AtomicBool::new(false)),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    //-------------------------------------------------------------------------------------
    // Token lifecycle
    //-------------------------------------------------------------------------------------

    /// Persists `token` with an expiry of now + TTL and arms the expiry timer.
    pub fn store_token(&self, token: &str, class: IdentityClass) {
        let keys = class.keys();
        let expires_at = self
            .clock
            .now()
            .checked_add_signed(self.settings.token_ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        self.write(keys.token_key, token);
        self.write(keys.expiry_key, &expires_at.timestamp_millis().to_string());
        info!(%class, %expires_at, "Stored session token");

        self.arm_expiry_timer(class);
    }

    /// Returns the token if it is present and unexpired.
    ///
    /// Anything else (missing token, missing or malformed expiry, lapsed expiry)
    /// purges the slot and yields `None`. A returned token may lapse immediately
    /// afterwards; this is a best-effort check.
    pub fn get_token(&self, class: IdentityClass) -> Option<String> {
        match self.read_record(class) {
            Some(record) if record.is_valid_at(self.clock.now()) => Some(record.token),
            _ => {
                self.clear_token(class);
                None
            }
        }
    }

    pub fn is_token_valid(&self, class: IdentityClass) -> bool {
        self.get_token(class).is_some()
    }

    /// Removes the token, its expiry and the class's session keys. Idempotent.
    pub fn clear_token(&self, class: IdentityClass) {
        let keys = class.keys();
        for key in [keys.token_key, keys.expiry_key]
            .into_iter()
            .chain(keys.session_keys.iter().copied())
        {
            self.delete(key);
        }
        self.disarm(class);
        debug!(%class, "Cleared session token");
    }

    /// Removes every session and profile key of both classes.
    ///
    /// Keys in the preserve list are never touched. Returns how many keys were
    /// actually present and removed.
    pub fn clear_all_tokens(&self) -> usize {
        let tracked: HashSet<&str> = IdentityClass::ALL
            .into_iter()
            .flat_map(IdentityClass::tracked_keys)
            .filter(|key| !keys::PRESERVED.contains(key))
            .collect();

        let mut removed = 0;
        for key in self.store.keys() {
            if tracked.contains(key.as_str()) {
                self.delete(&key);
                removed += 1;
            }
        }
        for class in IdentityClass::ALL {
            self.disarm(class);
        }
        info!(removed, "Cleared all session state");
        removed
    }

    /// Purges every class whose stored token has lapsed. Returns the number purged.
    pub fn cleanup_expired_tokens(&self) -> usize {
        let mut purged = 0;
        for class in IdentityClass::ALL {
            let keys = class.keys();
            let present =
                self.store.get(keys.token_key).is_some() || self.store.get(keys.expiry_key).is_some();
            if present && self.get_token(class).is_none() {
                info!(%class, "Purged expired session token");
                purged += 1;
            }
        }
        purged
    }

    /// Navigates to the login route matching the current area.
    ///
    /// Does nothing when the current path already is a login route. Returns
    /// whether a navigation happened.
    pub fn redirect_to_login(&self) -> bool {
        let path = self.navigator.current_path();
        if is_login_route(&path) {
            debug!(%path, "Already on a login route; not redirecting");
            return false;
        }
        let class = IdentityClass::from_path(&path);
        info!(%class, from = %path, "Redirecting to login");
        self.navigator.navigate(class.login_route());
        true
    }

    /// Milliseconds until the stored expiry, or zero when absent, malformed or past.
    pub fn token_expiry_time(&self, class: IdentityClass) -> u64 {
        let Some(expiry) = self
            .store
            .get(class.keys().expiry_key)
            .as_deref()
            .and_then(parse_expiry)
        else {
            return 0;
        };
        let remaining = expiry
            .timestamp_millis()
            .saturating_sub(self.clock.now().timestamp_millis());
        remaining.max(0) as u64
    }

    pub fn is_token_expiring_soon(&self, class: IdentityClass) -> bool {
        let remaining = self.token_expiry_time(class);
        let window = self.settings.expiring_soon_window.num_milliseconds().max(0) as u64;
        remaining > 0 && remaining < window
    }

    //-------------------------------------------------------------------------------------
    // Bootstrap and teardown
    //-------------------------------------------------------------------------------------

    /// Runs one cleanup pass and installs the recurring expiry sweep.
    ///
    /// Must be called once by the composition root. Later calls are ignored.
    pub fn initialize(&self) -> InitOutcome {
        if !self.store.is_available() {
            warn!("Key-value store unavailable; token manager not initialised");
            return InitOutcome::StorageUnavailable;
        }
        if self.initialized.swap(true, Ordering::SeqCst) {
            warn!("Token manager already initialised");
            return InitOutcome::AlreadyInitialized;
        }

        self.cleanup_expired_tokens();

        let Ok(handle) = Handle::try_current() else {
            warn!("No async runtime; expiry sweep not scheduled");
            return InitOutcome::NoRuntime;
        };

        let period = self
            .settings
            .sweep_interval
            .to_std()
            .ok()
            .filter(|period| !period.is_zero())
            .unwrap_or(FALLBACK_SWEEP_INTERVAL);
        let manager = self.clone();
        let shutdown = self.shutdown.clone();

        handle.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately and cleanup has just run.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        debug!("Token expiry sweep stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        manager.cleanup_expired_tokens();
                    }
                }
            }
        });

        info!(period_secs = period.as_secs(), "Token manager initialised");
        InitOutcome::Started
    }

    /// Cancels the recurring sweep and every armed expiry timer.
    pub fn dispose(&self) {
        self.shutdown.cancel();
        self.lock_timers().clear();
        info!("Token manager disposed");
    }

    //-------------------------------------------------------------------------------------
    // Profile cache
    //-------------------------------------------------------------------------------------

    /// Caches the admin display fields and drops any employee profile.
    pub fn store_admin_profile(&self, profile: &AdminProfile) {
        self.clear_profile(IdentityClass::Employee);
        self.write(keys::ADMIN_NAME, &profile.name);
        self.write(keys::ADMIN_EMAIL, &profile.email);
    }

    /// Caches the employee display fields and drops any admin profile.
    pub fn store_employee_profile(&self, profile: &EmployeeProfile) {
        self.clear_profile(IdentityClass::Admin);
        self.write(keys::EMPLOYEE_NAME, &profile.name);
        self.write(keys::EMPLOYEE_EMAIL, &profile.email);
        self.write(keys::EMPLOYEE_ID, &profile.id);
    }

    pub fn admin_profile(&self) -> Option<AdminProfile> {
        Some(AdminProfile {
            name: self.store.get(keys::ADMIN_NAME)?,
            email: self.store.get(keys::ADMIN_EMAIL).unwrap_or_default(),
        })
    }

    pub fn employee_profile(&self) -> Option<EmployeeProfile> {
        Some(EmployeeProfile {
            id: self.store.get(keys::EMPLOYEE_ID)?,
            name: self.store.get(keys::EMPLOYEE_NAME).unwrap_or_default(),
            email: self.store.get(keys::EMPLOYEE_EMAIL).unwrap_or_default(),
        })
    }

    //-------------------------------------------------------------------------------------
    // Internals
    //-------------------------------------------------------------------------------------

    fn read_record(&self, class: IdentityClass) -> Option<SessionRecord> {
        let keys = class.keys();
        let token = self.store.get(keys.token_key)?;
        let raw_expiry = self.store.get(keys.expiry_key)?;
        let Some(expires_at) = parse_expiry(&raw_expiry) else {
            warn!(%class, raw = %raw_expiry, "Malformed token expiry");
            return None;
        };
        Some(SessionRecord { token, expires_at })
    }

    fn arm_expiry_timer(&self, class: IdentityClass) {
        let Ok(handle) = Handle::try_current() else {
            debug!(%class, "No async runtime; relying on lazy expiry");
            return;
        };
        let Ok(delay) = self.settings.token_ttl.to_std() else {
            return;
        };

        let timer = self.shutdown.child_token();
        if let Some(previous) = self.lock_timers().insert(class, timer.clone()) {
            previous.cancel();
        }

        let manager = self.clone();
        handle.spawn(async move {
            tokio::select! {
                _ = timer.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    info!(%class, "Session token expired");
                    manager.expire(class);
                }
            }
        });
    }

    fn expire(&self, class: IdentityClass) {
        self.clear_token(class);
        if !is_login_route(&self.navigator.current_path()) {
            self.navigator.navigate(class.login_route());
        }
    }

    fn disarm(&self, class: IdentityClass) {
        if let Some(timer) = self.lock_timers().remove(&class) {
            timer.cancel();
        }
    }

    fn clear_profile(&self, class: IdentityClass) {
        for key in class.keys().profile_keys {
            self.delete(key);
        }
    }

    fn lock_timers(&self) -> MutexGuard<'_, HashMap<IdentityClass, CancellationToken>> {
        self.timers.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(e) = self.store.set(key, value) {
            warn!(key, error = %e, "Failed to write session key");
        }
    }

    fn delete(&self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            warn!(key, error = %e, "Failed to remove session key");
        }
    }
}

/// Parses a stored epoch-millisecond expiry. Out-of-range instants are rejected.
fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    let millis = raw.trim().parse::<i64>().ok()?;
    Utc.timestamp_millis_opt(millis).single()
}
