//! services/client/src/adapters/inventory.rs
//!
//! Implements the `InventoryFeed` port on top of the authenticated API client.

use async_trait::async_trait;
use godam_core::domain::{IdentityClass, ProductSnapshot, TaskSnapshot};
use godam_core::ports::{InventoryFeed, PortError, PortResult};
use serde::Deserialize;

use crate::http::ApiClient;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// Fetches products and tasks as the given identity class.
#[derive(Clone)]
pub struct ApiInventoryFeed {
    client: ApiClient,
    identity: IdentityClass,
}

impl ApiInventoryFeed {
    pub fn new(client: ApiClient, identity: IdentityClass) -> Self {
        Self { client, identity }
    }

    fn ensure_session(&self) -> PortResult<()> {
        if self.client.tokens().is_token_valid(self.identity) {
            Ok(())
        } else {
            Err(PortError::Unauthorized)
        }
    }
}

//=========================================================================================
// Wire Records
//=========================================================================================

#[derive(Deserialize)]
struct ProductRecord {
    #[serde(alias = "_id")]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(alias = "quantity")]
    stock: i64,
    #[serde(default, rename = "minStock", alias = "minimumStock", alias = "min_stock")]
    min_stock: Option<i64>,
}

impl ProductRecord {
    fn to_domain(self) -> ProductSnapshot {
        ProductSnapshot {
            id: self.id,
            name: self.name,
            stock: self.stock,
            min_stock: self.min_stock,
        }
    }
}

#[derive(Deserialize)]
struct TaskRecord {
    #[serde(alias = "_id")]
    id: String,
    title: String,
    #[serde(default)]
    status: String,
}

impl TaskRecord {
    fn to_domain(self) -> TaskSnapshot {
        TaskSnapshot {
            id: self.id,
            title: self.title,
            status: self.status,
        }
    }
}

//=========================================================================================
// `InventoryFeed` Trait Implementation
//=========================================================================================

#[async_trait]
impl InventoryFeed for ApiInventoryFeed {
    async fn fetch_products(&self) -> PortResult<Vec<ProductSnapshot>> {
        self.ensure_session()?;
        let records: Vec<ProductRecord> =
            self.client.get_data("/products", self.identity).await?;
        Ok(records.into_iter().map(ProductRecord::to_domain).collect())
    }

    async fn fetch_tasks(&self) -> PortResult<Vec<TaskSnapshot>> {
        self.ensure_session()?;
        let records: Vec<TaskRecord> = self.client.get_data("/tasks", self.identity).await?;
        Ok(records.into_iter().map(TaskRecord::to_domain).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_records_accept_backend_aliases() {
        let record: ProductRecord = serde_json::from_str(
            r#"{"_id":"65f0","name":"Basmati","quantity":4,"minimumStock":8}"#,
        )
        .unwrap();
        let product = record.to_domain();
        assert_eq!(product.id, "65f0");
        assert_eq!(product.stock, 4);
        assert_eq!(product.min_stock, Some(8));
    }

    #[test]
    fn task_status_defaults_to_empty() {
        let record: TaskRecord = serde_json::from_str(r#"{"id":"t1","title":"Audit"}"#).unwrap();
        assert!(!record.to_domain().is_completed());
    }
}
