use std::sync::Arc;

use alerts::AlertEvaluator;
use common::{ItemId, WarehouseId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{InMemoryInventoryCatalog, InventoryItem};
use rust_decimal::Decimal;
use stock_store::{InMemoryStockStore, InMemoryThresholdRegistry, StockLevelStoreExt, ThresholdUpdate};

/// Populates `n` items across three warehouses, every third one below its
/// minimum.
async fn populate(n: i64) -> AlertEvaluator {
    let stock = InMemoryStockStore::new();
    let inventory = InMemoryInventoryCatalog::new();
    let evaluator = AlertEvaluator::new(
        Arc::new(stock.clone()),
        Arc::new(InMemoryThresholdRegistry::new()),
        Arc::new(inventory.clone()),
    );

    for id in 1..=n {
        inventory
            .insert(InventoryItem::new(id, format!("SKU-{id:04}"), format!("Part {id}"), Decimal::from(7)))
            .await;
        evaluator
            .update_thresholds(
                ItemId::new(id),
                ThresholdUpdate {
                    minimum_stock_level: Decimal::from(30),
                    maximum_stock_level: Some(Decimal::from(500)),
                    reorder_point: Decimal::from(45),
                    reorder_quantity: Decimal::from(100),
                },
            )
            .await
            .unwrap();

        let per_warehouse = if id % 3 == 0 { 5 } else { 40 };
        for wh in 1..=3 {
            stock
                .adjust(ItemId::new(id), WarehouseId::new(wh), Decimal::from(per_warehouse))
                .await
                .unwrap();
        }
    }

    evaluator
}

fn bench_list_active_alerts(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let evaluator = rt.block_on(populate(500));

    c.bench_function("alerts/list_active_alerts_500_items", |b| {
        b.iter(|| {
            rt.block_on(async {
                let alerts = evaluator.list_active_alerts().await.unwrap();
                assert_eq!(alerts.len(), 166);
            });
        });
    });
}

fn bench_suggest_reorders(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let evaluator = rt.block_on(populate(500));

    c.bench_function("alerts/suggest_reorders_500_items", |b| {
        b.iter(|| {
            rt.block_on(async {
                evaluator.suggest_reorders().await.unwrap();
            });
        });
    });
}

criterion_group!(benches, bench_list_active_alerts, bench_suggest_reorders);
criterion_main!(benches);
