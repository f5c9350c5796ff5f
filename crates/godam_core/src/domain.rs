//! crates/godam_core/src/domain.rs
//!
//! Defines the pure, core data structures for the session shell: identity
//! classes and their storage key table, the persisted journal records, profile
//! cache entries, inventory snapshots and the alerts raised from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//=========================================================================================
// Storage Keys
//=========================================================================================

pub mod keys {
    pub const ADMIN_TOKEN: &str = "token";
    pub const ADMIN_TOKEN_EXPIRY: &str = "tokenExpiry";
    pub const ADMIN_NAME: &str = "admin";
    pub const ADMIN_EMAIL: &str = "adminEmail";

    pub const EMPLOYEE_TOKEN: &str = "employeeToken";
    pub const EMPLOYEE_TOKEN_EXPIRY: &str = "employeeTokenExpiry";
    pub const EMPLOYEE_NAME: &str = "employee";
    pub const EMPLOYEE_EMAIL: &str = "employeeEmail";
    pub const EMPLOYEE_ID: &str = "employeeId";

    pub const LOW_STOCK_ALERTS: &str = "lowStockAlerts";
    pub const READ_NOTIFICATIONS: &str = "readNotifications";

    /// Keys owned by third-party auth libraries. Bulk clears never touch them.
    pub const PRESERVED: [&str; 3] = [
        "next-auth.session-token",
        "next-auth.csrf-token",
        "next-auth.callback-url",
    ];
}

//=========================================================================================
// Identity Classes
//=========================================================================================

/// Path segment that marks the employee area of the application.
pub const EMPLOYEE_AREA_SEGMENT: &str = "employees/";

/// The two independent kinds of signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityClass {
    Admin,
    Employee,
}

/// Storage layout and login surface of one identity class.
#[derive(Debug)]
pub struct IdentityKeys {
    pub token_key: &'static str,
    pub expiry_key: &'static str,
    /// Extra keys that belong to the session itself and die with the token.
    pub session_keys: &'static [&'static str],
    /// Display fields mirrored from the backend.
    pub profile_keys: &'static [&'static str],
    pub login_route: &'static str,
}

static ADMIN_KEYS: IdentityKeys = IdentityKeys {
    token_key: keys::ADMIN_TOKEN,
    expiry_key: keys::ADMIN_TOKEN_EXPIRY,
    session_keys: &[],
    profile_keys: &[keys::ADMIN_NAME, keys::ADMIN_EMAIL],
    login_route: "/login",
};

static EMPLOYEE_KEYS: IdentityKeys = IdentityKeys {
    token_key: keys::EMPLOYEE_TOKEN,
    expiry_key: keys::EMPLOYEE_TOKEN_EXPIRY,
    session_keys: &[keys::EMPLOYEE_ID],
    profile_keys: &[keys::EMPLOYEE_NAME, keys::EMPLOYEE_EMAIL, keys::EMPLOYEE_ID],
    login_route: "/employees/login",
};

impl IdentityClass {
    pub const ALL: [IdentityClass; 2] = [IdentityClass::Admin, IdentityClass::Employee];

    pub fn keys(self) -> &'static IdentityKeys {
        match self {
            IdentityClass::Admin => &ADMIN_KEYS,
            IdentityClass::Employee => &EMPLOYEE_KEYS,
        }
    }

    pub fn login_route(self) -> &'static str {
        self.keys().login_route
    }

    /// The class whose profile must be dropped when this one signs in.
    pub fn opposite(self) -> IdentityClass {
        match self {
            IdentityClass::Admin => IdentityClass::Employee,
            IdentityClass::Employee => IdentityClass::Admin,
        }
    }

    /// Infers the identity class from a route path.
    pub fn from_path(path: &str) -> IdentityClass {
        if path.contains(EMPLOYEE_AREA_SEGMENT) {
            IdentityClass::Employee
        } else {
            IdentityClass::Admin
        }
    }

    /// Every key tracked for this class: token, expiry, session and profile keys.
    pub fn tracked_keys(self) -> impl Iterator<Item = &'static str> {
        let k = self.keys();
        [k.token_key, k.expiry_key]
            .into_iter()
            .chain(k.session_keys.iter().copied())
            .chain(k.profile_keys.iter().copied())
    }
}

impl std::fmt::Display for IdentityClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityClass::Admin => f.write_str("admin"),
            IdentityClass::Employee => f.write_str("employee"),
        }
    }
}

impl std::str::FromStr for IdentityClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(IdentityClass::Admin),
            "employee" => Ok(IdentityClass::Employee),
            other => Err(format!("unknown identity class '{}'", other)),
        }
    }
}

/// Returns true when `path` is one of the login surfaces.
pub fn is_login_route(path: &str) -> bool {
    IdentityClass::ALL
        .iter()
        .any(|class| path == class.login_route())
}

//=========================================================================================
// Session and Profile Records
//=========================================================================================

/// A bearer token and the instant after which it is no longer accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminProfile {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployeeProfile {
    pub id: String,
    pub name: String,
    pub email: String,
}

//=========================================================================================
// Notification Journals
//=========================================================================================

/// What a notification was about. Unknown stored values decode as `General`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationCategory {
    Stock,
    Task,
    Order,
    #[serde(other)]
    General,
}

/// The last low-stock alert raised for one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockAlertRecord {
    pub stock: i64,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

/// A notification the user has dismissed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadNotification {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_product: Option<String>,
    pub category: NotificationCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_title: Option<String>,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

//=========================================================================================
// Inventory Snapshots and Alerts
//=========================================================================================

/// Current stock level of a product as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSnapshot {
    pub id: String,
    pub name: String,
    pub stock: i64,
    /// Product-specific reorder level, if the backend tracks one.
    pub min_stock: Option<i64>,
}

impl ProductSnapshot {
    pub fn is_low_stock(&self, default_threshold: i64) -> bool {
        self.stock < self.min_stock.unwrap_or(default_threshold)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSnapshot {
    pub id: String,
    pub title: String,
    pub status: String,
}

impl TaskSnapshot {
    pub fn is_completed(&self) -> bool {
        let status = self.status.trim();
        status.eq_ignore_ascii_case("completed") || status.eq_ignore_ascii_case("done")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AlertKind {
    LowStock {
        product_id: String,
        name: String,
        stock: i64,
    },
    TaskCompleted {
        task_id: String,
        title: String,
    },
}

/// A notification surfaced to the user by the poller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub id: Uuid,
    pub kind: AlertKind,
    pub raised_at: DateTime<Utc>,
}

impl Alert {
    pub fn new(kind: AlertKind, raised_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            raised_at,
        }
    }

    pub fn category(&self) -> NotificationCategory {
        match self.kind {
            AlertKind::LowStock { .. } => NotificationCategory::Stock,
            AlertKind::TaskCompleted { .. } => NotificationCategory::Task,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn employee_area_is_inferred_from_path_segment() {
        assert_eq!(
            IdentityClass::from_path("/employees/dashboard"),
            IdentityClass::Employee
        );
        assert_eq!(IdentityClass::from_path("/dashboard"), IdentityClass::Admin);
        assert_eq!(IdentityClass::from_path("/employees"), IdentityClass::Admin);
    }

    #[test]
    fn tracked_keys_cover_session_and_profile_fields() {
        let employee: Vec<_> = IdentityClass::Employee.tracked_keys().collect();
        assert!(employee.contains(&"employeeToken"));
        assert!(employee.contains(&"employeeTokenExpiry"));
        assert!(employee.contains(&"employeeId"));
        assert!(employee.contains(&"employeeEmail"));

        let admin: Vec<_> = IdentityClass::Admin.tracked_keys().collect();
        assert_eq!(admin, vec!["token", "tokenExpiry", "admin", "adminEmail"]);
    }

    #[test]
    fn unknown_category_decodes_as_general() {
        let entry: ReadNotification = serde_json::from_str(
            r#"{"id":"n1","category":"supplier","timestamp":5}"#,
        )
        .unwrap();
        assert_eq!(entry.category, NotificationCategory::General);
        assert_eq!(entry.related_product, None);
    }

    #[test]
    fn low_stock_prefers_product_reorder_level() {
        let mut product = ProductSnapshot {
            id: "p1".into(),
            name: "Rice".into(),
            stock: 12,
            min_stock: None,
        };
        assert!(!product.is_low_stock(10));
        product.min_stock = Some(20);
        assert!(product.is_low_stock(10));
    }

    #[test]
    fn identity_class_parses_case_insensitively() {
        assert_eq!("Employee".parse::<IdentityClass>(), Ok(IdentityClass::Employee));
        assert!("guest".parse::<IdentityClass>().is_err());
    }
}
