//! services/client/src/adapters/storage.rs
//!
//! Key-value store adapters implementing the `KeyValueStore` port: a JSON file
//! shared by every shell process on the machine, and an in-memory map.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use godam_core::ports::{KeyValueStore, PortError, PortResult};
use tracing::warn;

type Entries = BTreeMap<String, String>;

//=========================================================================================
// File-backed Store
//=========================================================================================

/// A flat JSON object on disk, re-read on every operation.
///
/// Several processes may share one file. Writes are whole-file replacements
/// with no locking across processes, so the last writer wins.
pub struct FileStore {
    path: PathBuf,
    // Serialises read-modify-write cycles within this process only.
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Entries {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Entries::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Unreadable storage file");
                return Entries::new();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "Corrupt storage file; starting empty");
            Entries::new()
        })
    }

    fn write_entries(&self, entries: &Entries) -> PortResult<()> {
        let json =
            serde_json::to_string_pretty(entries).map_err(|e| PortError::Storage(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json).map_err(|e| PortError::Storage(e.to_string()))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| PortError::Storage(e.to_string()))
    }

    fn modify(&self, change: impl FnOnce(&mut Entries) -> bool) -> PortResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.read_entries();
        if change(&mut entries) {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.read_entries().remove(key)
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        self.modify(|entries| {
            entries.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        self.modify(|entries| entries.remove(key).is_some())
    }

    fn keys(&self) -> Vec<String> {
        self.read_entries().into_keys().collect()
    }

    fn is_available(&self) -> bool {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.is_dir(),
            _ => true,
        }
    }
}

//=========================================================================================
// In-memory Store
//=========================================================================================

/// Process-local storage; nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<Entries>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        self.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        self.write().remove(key);
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }
}
