//! Integration tests: stock movements and transfers feeding the alert evaluator.

use std::sync::Arc;

use alerts::{AlertEvaluator, AlertLevel};
use common::{ActorId, ItemId, WarehouseId};
use domain::{
    CreateTransfer, InMemoryEventSink, InMemoryInventoryCatalog, InMemoryTransferRepository,
    InMemoryWarehouseCatalog, InventoryItem, NewTransferItem, TransferWorkflow, Warehouse,
};
use rust_decimal_macros::dec;
use stock_store::{InMemoryStockStore, InMemoryThresholdRegistry, StockLevelStoreExt, ThresholdUpdate};

const FILTER: ItemId = ItemId::new(10);
const BELT: ItemId = ItemId::new(11);
const PUMP: ItemId = ItemId::new(12);

struct Fixture {
    evaluator: AlertEvaluator,
    workflow: TransferWorkflow,
    stock: InMemoryStockStore,
}

async fn setup() -> Fixture {
    let warehouses = InMemoryWarehouseCatalog::new();
    warehouses.insert(Warehouse::new(1, "Main")).await;
    warehouses.insert(Warehouse::new(2, "Branch")).await;

    let inventory = InMemoryInventoryCatalog::new();
    inventory
        .insert(InventoryItem::new(10, "FLT-001", "Oil filter", dec!(18)))
        .await;
    inventory
        .insert(InventoryItem::new(11, "BLT-002", "Timing belt", dec!(42.50)))
        .await;
    inventory
        .insert(InventoryItem::new(12, "PMP-003", "Water pump", dec!(120)))
        .await;

    let stock = InMemoryStockStore::new();
    let inventory = Arc::new(inventory);

    let evaluator = AlertEvaluator::new(
        Arc::new(stock.clone()),
        Arc::new(InMemoryThresholdRegistry::new()),
        inventory.clone(),
    );
    let workflow = TransferWorkflow::new(
        Arc::new(InMemoryTransferRepository::new()),
        Arc::new(stock.clone()),
        Arc::new(warehouses),
        inventory,
        Arc::new(InMemoryEventSink::new()),
    );

    Fixture {
        evaluator,
        workflow,
        stock,
    }
}

fn thresholds(min: i64, point: i64, qty: i64) -> ThresholdUpdate {
    ThresholdUpdate {
        minimum_stock_level: min.into(),
        maximum_stock_level: None,
        reorder_point: point.into(),
        reorder_quantity: qty.into(),
    }
}

#[tokio::test]
async fn test_low_stock_across_warehouses() {
    let f = setup().await;
    f.evaluator
        .update_thresholds(FILTER, thresholds(10, 15, 30))
        .await
        .unwrap();
    f.stock.adjust(FILTER, WarehouseId::new(1), dec!(5)).await.unwrap();
    f.stock.adjust(FILTER, WarehouseId::new(2), dec!(3)).await.unwrap();

    assert_eq!(f.evaluator.evaluate(FILTER).await.unwrap(), AlertLevel::LowStock);

    let alerts = f.evaluator.list_active_alerts().await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].item_id, FILTER);
    assert_eq!(alerts[0].alert_level, AlertLevel::LowStock);
    assert_eq!(alerts[0].quantity, dec!(8));
    assert_eq!(alerts[0].stock_deficit, dec!(-2));
    assert_eq!(alerts[0].item_name.as_deref(), Some("Oil filter"));

    let reorders = f.evaluator.suggest_reorders().await.unwrap();
    assert_eq!(reorders.len(), 1);
    assert_eq!(reorders[0].item_id, FILTER);
    assert_eq!(reorders[0].suggested_quantity, dec!(30));
    assert_eq!(reorders[0].estimated_cost, dec!(540));
}

#[tokio::test]
async fn test_alerts_sorted_by_severity() {
    let f = setup().await;
    f.evaluator.update_thresholds(FILTER, thresholds(10, 15, 30)).await.unwrap();
    f.evaluator.update_thresholds(BELT, thresholds(4, 6, 10)).await.unwrap();
    f.evaluator.update_thresholds(PUMP, thresholds(2, 3, 2)).await.unwrap();

    f.stock.adjust(FILTER, WarehouseId::new(1), dec!(7)).await.unwrap();
    f.stock.adjust(PUMP, WarehouseId::new(1), dec!(9)).await.unwrap();

    let alerts = f.evaluator.list_active_alerts().await.unwrap();
    let summary: Vec<_> = alerts
        .iter()
        .map(|a| (a.item_id, a.alert_level, a.stock_deficit))
        .collect();
    assert_eq!(
        summary,
        vec![
            (BELT, AlertLevel::OutOfStock, dec!(-4)),
            (FILTER, AlertLevel::LowStock, dec!(-3)),
        ]
    );

    let reorders: Vec<_> = f
        .evaluator
        .suggest_reorders()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.item_id)
        .collect();
    assert_eq!(reorders, vec![FILTER, BELT]);
}

#[tokio::test]
async fn test_repeated_reads_are_identical() {
    let f = setup().await;
    f.evaluator.update_thresholds(FILTER, thresholds(10, 15, 30)).await.unwrap();
    f.evaluator.update_thresholds(BELT, thresholds(4, 6, 10)).await.unwrap();
    f.stock.adjust(FILTER, WarehouseId::new(1), dec!(2)).await.unwrap();

    let first = f.evaluator.list_active_alerts().await.unwrap();
    let second = f.evaluator.list_active_alerts().await.unwrap();
    assert_eq!(first, second);

    let first = f.evaluator.suggest_reorders().await.unwrap();
    let second = f.evaluator.suggest_reorders().await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_transfer_keeps_aggregate_until_received() {
    let f = setup().await;
    f.evaluator.update_thresholds(FILTER, thresholds(10, 15, 30)).await.unwrap();
    f.stock.adjust(FILTER, WarehouseId::new(1), dec!(12)).await.unwrap();

    let transfer = f
        .workflow
        .create(
            CreateTransfer::new(WarehouseId::new(1), WarehouseId::new(2), ActorId::new(1))
                .with_item(NewTransferItem::new(FILTER, dec!(5))),
        )
        .await
        .unwrap();
    assert_eq!(f.evaluator.evaluate(FILTER).await.unwrap(), AlertLevel::Normal);

    // Shipped stock has left the source but not yet arrived
    f.workflow.ship(transfer.id, ActorId::new(2)).await.unwrap();
    assert_eq!(f.evaluator.evaluate(FILTER).await.unwrap(), AlertLevel::LowStock);

    f.workflow.receive(transfer.id, ActorId::new(3)).await.unwrap();
    assert_eq!(f.evaluator.evaluate(FILTER).await.unwrap(), AlertLevel::Normal);
}

#[tokio::test]
async fn test_issuing_last_unit_goes_out_of_stock() {
    let f = setup().await;
    f.evaluator.update_thresholds(PUMP, thresholds(1, 1, 5)).await.unwrap();
    f.workflow
        .receive_stock(PUMP, WarehouseId::new(2), dec!(1), ActorId::new(1), None)
        .await
        .unwrap();
    assert_eq!(f.evaluator.evaluate(PUMP).await.unwrap(), AlertLevel::Normal);

    f.workflow
        .issue_stock(PUMP, WarehouseId::new(2), dec!(1), ActorId::new(1), Some("WO-17".to_string()))
        .await
        .unwrap();

    let alerts = f.evaluator.list_active_alerts().await.unwrap();
    assert_eq!(alerts[0].alert_level, AlertLevel::OutOfStock);
    assert_eq!(alerts[0].stock_deficit, dec!(-1));
    assert_eq!(f.evaluator.suggest_reorders().await.unwrap()[0].estimated_cost, dec!(600));
}
