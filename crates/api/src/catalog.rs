//! Seed data for the in-process warehouse and item catalogs.

use std::path::Path;

use domain::{InMemoryInventoryCatalog, InMemoryWarehouseCatalog, InventoryItem, Warehouse};
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse catalog file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Contents of the `CATALOG_PATH` file.
///
/// ```json
/// { "warehouses": [{ "id": 1, "name": "Main" }],
///   "items": [{ "id": 10, "sku": "FLT-001", "name": "Oil filter", "purchase_price": "18.00" }] }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub warehouses: Vec<Warehouse>,
    #[serde(default)]
    pub items: Vec<InventoryItem>,
}

impl CatalogSeed {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Loads the seed into fresh in-memory catalogs.
    pub async fn into_catalogs(self) -> (InMemoryWarehouseCatalog, InMemoryInventoryCatalog) {
        let warehouses = InMemoryWarehouseCatalog::new();
        for warehouse in self.warehouses {
            warehouses.insert(warehouse).await;
        }

        let inventory = InMemoryInventoryCatalog::new();
        for item in self.items {
            inventory.insert(item).await;
        }

        (warehouses, inventory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seed_with_defaults() {
        let seed: CatalogSeed = serde_json::from_str(
            r#"{
                "warehouses": [{ "id": 1, "name": "Main" }, { "id": 2, "name": "Branch" }],
                "items": [{ "id": 10, "sku": "FLT-001", "name": "Oil filter", "purchase_price": 18 }]
            }"#,
        )
        .unwrap();

        assert_eq!(seed.warehouses.len(), 2);
        assert_eq!(seed.items[0].unit, "pcs");
        assert_eq!(seed.items[0].purchase_price, rust_decimal::Decimal::from(18));
    }

    #[test]
    fn test_empty_seed() {
        let seed: CatalogSeed = serde_json::from_str("{}").unwrap();
        assert!(seed.warehouses.is_empty());
        assert!(seed.items.is_empty());
    }
}
