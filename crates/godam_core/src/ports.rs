//! crates/godam_core/src/ports.rs
//!
//! Defines the service contracts (traits) the managers are written against.
//! Persistent storage, wall-clock time, route navigation and the inventory
//! backend are all supplied by adapters in the `client` service.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{ProductSnapshot, TaskSnapshot};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Origin-scoped string key-value storage shared by every part of the shell.
///
/// Reads are infallible: an unreadable backing store simply has no keys.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> PortResult<()>;

    /// Removing an absent key is not an error.
    fn remove(&self, key: &str) -> PortResult<()>;

    fn keys(&self) -> Vec<String>;

    /// Whether the backing store can be used at all in this execution context.
    fn is_available(&self) -> bool {
        true
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Access to the current route and the ability to move to another one.
pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;

    fn navigate(&self, path: &str);
}

/// Fresh business state from the backend, re-fetched on every poll.
#[async_trait]
pub trait InventoryFeed: Send + Sync {
    async fn fetch_products(&self) -> PortResult<Vec<ProductSnapshot>>;

    async fn fetch_tasks(&self) -> PortResult<Vec<TaskSnapshot>>;
}
