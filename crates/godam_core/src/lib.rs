pub mod domain;
pub mod guard;
pub mod logout;
pub mod notifications;
pub mod ports;
pub mod settings;
pub mod token;

#[cfg(test)]
mod test_support;

pub use domain::{
    Alert, AlertKind, AdminProfile, EmployeeProfile, IdentityClass, NotificationCategory,
    ProductSnapshot, ReadNotification, SessionRecord, TaskSnapshot,
};
pub use guard::{AuthGuard, GuardDecision};
pub use logout::LogoutManager;
pub use notifications::NotificationManager;
pub use ports::{Clock, InventoryFeed, KeyValueStore, Navigator, PortError, PortResult};
pub use settings::SessionSettings;
pub use token::{InitOutcome, TokenManager};
