//! Alert evaluation over live stock quantities.

use std::sync::Arc;

use common::ItemId;
use domain::{DomainError, InventoryCatalog, InventoryItem};
use futures_util::future::try_join_all;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stock_store::{AlertThreshold, StockLevelStore, ThresholdRegistry, ThresholdUpdate};

use crate::{AlertError, AlertLevel, Result};

/// An item whose aggregate quantity is below its configured minimum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockAlert {
    pub item_id: ItemId,
    /// `None` if the item is missing from the catalog.
    pub item_name: Option<String>,
    pub sku: Option<String>,
    pub quantity: Decimal,
    pub alert_level: AlertLevel,
    pub minimum_stock_level: Decimal,
    /// `quantity - minimum_stock_level`; always negative for an active alert.
    pub stock_deficit: Decimal,
}

/// A restock proposal for an item at or below its reorder point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReorderSuggestion {
    pub item_id: ItemId,
    pub item_name: String,
    pub sku: String,
    pub quantity: Decimal,
    pub reorder_point: Decimal,
    pub suggested_quantity: Decimal,
    pub unit_price: Decimal,
    pub estimated_cost: Decimal,
}

/// Joins stock aggregates with per-item thresholds.
///
/// Holds no state of its own. Repeated calls without intervening stock or
/// threshold writes return identical results.
#[derive(Clone)]
pub struct AlertEvaluator {
    stock: Arc<dyn StockLevelStore>,
    thresholds: Arc<dyn ThresholdRegistry>,
    inventory: Arc<dyn InventoryCatalog>,
}

impl AlertEvaluator {
    pub fn new(
        stock: Arc<dyn StockLevelStore>,
        thresholds: Arc<dyn ThresholdRegistry>,
        inventory: Arc<dyn InventoryCatalog>,
    ) -> Self {
        Self {
            stock,
            thresholds,
            inventory,
        }
    }

    /// Classifies a single item's aggregate quantity.
    #[tracing::instrument(skip(self))]
    pub async fn evaluate(&self, item_id: ItemId) -> Result<AlertLevel> {
        metrics::counter!("alert_evaluations_total", "operation" => "evaluate").increment(1);

        let Some(threshold) = self.thresholds.get(item_id).await? else {
            return Ok(AlertLevel::Normal);
        };
        let quantity = self.stock.get_aggregate_quantity(item_id).await?;
        Ok(AlertLevel::classify(quantity, Some(&threshold)))
    }

    /// Lists every configured item that is low or out of stock, most severe
    /// deficit first.
    #[tracing::instrument(skip(self))]
    pub async fn list_active_alerts(&self) -> Result<Vec<StockAlert>> {
        metrics::counter!("alert_evaluations_total", "operation" => "list_active_alerts")
            .increment(1);

        let evaluated = self.with_quantities().await?;

        let mut alerts = Vec::new();
        for (threshold, quantity) in evaluated {
            let level = AlertLevel::classify(quantity, Some(&threshold));
            if !level.is_active() {
                continue;
            }

            let item = self.inventory.get(threshold.item_id).await?;
            alerts.push(StockAlert {
                item_id: threshold.item_id,
                item_name: item.as_ref().map(|i| i.name.clone()),
                sku: item.map(|i| i.sku),
                quantity,
                alert_level: level,
                minimum_stock_level: threshold.minimum_stock_level,
                stock_deficit: quantity - threshold.minimum_stock_level,
            });
        }

        alerts.sort_by(|a, b| {
            a.stock_deficit
                .cmp(&b.stock_deficit)
                .then(a.item_id.cmp(&b.item_id))
        });

        tracing::debug!(count = alerts.len(), "evaluated active alerts");
        Ok(alerts)
    }

    /// Lists restock proposals for items at or below their reorder point,
    /// ordered by item id.
    ///
    /// Fails with `NotFound` if a configured item is missing from the
    /// catalog, since its cost cannot be estimated.
    #[tracing::instrument(skip(self))]
    pub async fn suggest_reorders(&self) -> Result<Vec<ReorderSuggestion>> {
        metrics::counter!("alert_evaluations_total", "operation" => "suggest_reorders")
            .increment(1);

        let evaluated = self.with_quantities().await?;

        let mut suggestions = Vec::new();
        for (threshold, quantity) in evaluated {
            if quantity > threshold.reorder_point {
                continue;
            }

            let item = self.catalog_item(threshold.item_id).await?;
            let estimated_cost = threshold
                .reorder_quantity
                .checked_mul(item.purchase_price)
                .ok_or(AlertError::CostOutOfRange(threshold.item_id))?;
            suggestions.push(ReorderSuggestion {
                item_id: threshold.item_id,
                item_name: item.name,
                sku: item.sku,
                quantity,
                reorder_point: threshold.reorder_point,
                suggested_quantity: threshold.reorder_quantity,
                unit_price: item.purchase_price,
                estimated_cost,
            });
        }

        suggestions.sort_by_key(|s| s.item_id);
        Ok(suggestions)
    }

    pub async fn get_thresholds(&self, item_id: ItemId) -> Result<Option<AlertThreshold>> {
        Ok(self.thresholds.get(item_id).await?)
    }

    /// Creates or replaces an item's thresholds. The item must exist in the
    /// inventory catalog.
    #[tracing::instrument(skip(self))]
    pub async fn update_thresholds(
        &self,
        item_id: ItemId,
        update: ThresholdUpdate,
    ) -> Result<AlertThreshold> {
        self.catalog_item(item_id).await?;
        let threshold = self.thresholds.upsert(item_id, update).await?;

        tracing::info!(
            %item_id,
            minimum = %threshold.minimum_stock_level,
            reorder_point = %threshold.reorder_point,
            "alert thresholds updated"
        );
        Ok(threshold)
    }

    /// Pairs every configured threshold with its item's aggregate quantity.
    async fn with_quantities(&self) -> Result<Vec<(AlertThreshold, Decimal)>> {
        let thresholds = self.thresholds.list().await?;

        let quantities = try_join_all(
            thresholds
                .iter()
                .map(|t| self.stock.get_aggregate_quantity(t.item_id)),
        )
        .await?;

        Ok(thresholds.into_iter().zip(quantities).collect())
    }

    async fn catalog_item(&self, item_id: ItemId) -> Result<InventoryItem> {
        self.inventory
            .get(item_id)
            .await?
            .ok_or_else(|| DomainError::not_found("InventoryItem", item_id).into())
    }
}
