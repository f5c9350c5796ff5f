//! In-memory fakes for the ports, shared by the unit tests of this crate.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::ports::{Clock, KeyValueStore, Navigator, PortError, PortResult};

#[derive(Default)]
pub struct FakeStore {
    entries: Mutex<BTreeMap<String, String>>,
    unavailable: bool,
}

impl FakeStore {
    pub fn unavailable() -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            unavailable: true,
        }
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries.lock().unwrap().clone()
    }
}

impl KeyValueStore for FakeStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        if self.unavailable {
            return Err(PortError::Storage("store unavailable".into()));
        }
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.entries.lock().unwrap().keys().cloned().collect()
    }

    fn is_available(&self) -> bool {
        !self.unavailable
    }
}

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now = *now + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub struct RecordingNavigator {
    path: Mutex<String>,
    visits: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn at(path: &str) -> Self {
        Self {
            path: Mutex::new(path.to_string()),
            visits: Mutex::new(Vec::new()),
        }
    }

    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn current_path(&self) -> String {
        self.path.lock().unwrap().clone()
    }

    fn navigate(&self, path: &str) {
        *self.path.lock().unwrap() = path.to_string();
        self.visits.lock().unwrap().push(path.to_string());
    }
}

pub struct Harness {
    pub store: Arc<FakeStore>,
    pub clock: Arc<ManualClock>,
    pub navigator: Arc<RecordingNavigator>,
}

impl Harness {
    pub fn at(path: &str) -> Self {
        Self {
            store: Arc::new(FakeStore::default()),
            clock: Arc::new(ManualClock::new()),
            navigator: Arc::new(RecordingNavigator::at(path)),
        }
    }
}
