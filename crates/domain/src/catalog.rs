//! Read-only lookups into the external warehouse and inventory catalogs.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{ItemId, WarehouseId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::DomainError;

/// A warehouse as known to the external catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: WarehouseId,
    pub name: String,
}

impl Warehouse {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id: WarehouseId::new(id),
            name: name.into(),
        }
    }
}

/// An inventory item as known to the external catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: ItemId,
    pub sku: String,
    pub name: String,
    #[serde(default = "default_unit")]
    pub unit: String,
    pub purchase_price: Decimal,
}

fn default_unit() -> String {
    "pcs".to_string()
}

impl InventoryItem {
    pub fn new(id: i64, sku: impl Into<String>, name: impl Into<String>, purchase_price: Decimal) -> Self {
        Self {
            id: ItemId::new(id),
            sku: sku.into(),
            name: name.into(),
            unit: default_unit(),
            purchase_price,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }
}

#[async_trait]
pub trait WarehouseCatalog: Send + Sync {
    async fn get(&self, id: WarehouseId) -> Result<Option<Warehouse>, DomainError>;

    async fn exists(&self, id: WarehouseId) -> Result<bool, DomainError> {
        Ok(self.get(id).await?.is_some())
    }
}

#[async_trait]
pub trait InventoryCatalog: Send + Sync {
    async fn get(&self, id: ItemId) -> Result<Option<InventoryItem>, DomainError>;
}

/// In-memory warehouse catalog.
#[derive(Clone, Default)]
pub struct InMemoryWarehouseCatalog {
    warehouses: Arc<RwLock<BTreeMap<WarehouseId, Warehouse>>>,
}

impl InMemoryWarehouseCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, warehouse: Warehouse) {
        self.warehouses.write().await.insert(warehouse.id, warehouse);
    }
}

#[async_trait]
impl WarehouseCatalog for InMemoryWarehouseCatalog {
    async fn get(&self, id: WarehouseId) -> Result<Option<Warehouse>, DomainError> {
        Ok(self.warehouses.read().await.get(&id).cloned())
    }
}

/// In-memory inventory catalog.
#[derive(Clone, Default)]
pub struct InMemoryInventoryCatalog {
    items: Arc<RwLock<BTreeMap<ItemId, InventoryItem>>>,
}

impl InMemoryInventoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, item: InventoryItem) {
        self.items.write().await.insert(item.id, item);
    }
}

#[async_trait]
impl InventoryCatalog for InMemoryInventoryCatalog {
    async fn get(&self, id: ItemId) -> Result<Option<InventoryItem>, DomainError> {
        Ok(self.items.read().await.get(&id).cloned())
    }
}
