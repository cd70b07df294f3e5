//! Transfer workflow: the only writer of stock on behalf of transfers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use common::{ActorId, ItemId, TransferId, WarehouseId};
use rust_decimal::Decimal;
use stock_store::{MovementKind, StockAdjustment, StockLevel, StockLevelStore, StockStoreError};

use crate::catalog::{InventoryCatalog, WarehouseCatalog};
use crate::error::DomainError;
use crate::sink::EventSink;

use super::locks::TransferLocks;
use super::{
    CreateTransfer, Page, StockTransfer, StockTransferItem, TransferCache, TransferError,
    TransferEvent, TransferEventData, TransferFilter, TransferRepository, TransferStats,
    Transition,
};

/// Retries allowed when a generated transfer number is already taken.
const NUMBER_ATTEMPTS: u64 = 5;

/// Service driving transfers through their lifecycle.
///
/// Transitions on the same transfer are serialized by an in-process lock and
/// persisted with an optimistic version check. `ship` and `receive` move
/// stock through one atomic batch; if the transfer cannot be persisted
/// afterwards the batch is reversed before the error is returned.
#[derive(Clone)]
pub struct TransferWorkflow {
    repository: Arc<dyn TransferRepository>,
    stock: Arc<dyn StockLevelStore>,
    warehouses: Arc<dyn WarehouseCatalog>,
    inventory: Arc<dyn InventoryCatalog>,
    sink: Arc<dyn EventSink>,
    cache: TransferCache,
    locks: TransferLocks,
    sequence: Arc<AtomicU64>,
}

impl TransferWorkflow {
    pub fn new(
        repository: Arc<dyn TransferRepository>,
        stock: Arc<dyn StockLevelStore>,
        warehouses: Arc<dyn WarehouseCatalog>,
        inventory: Arc<dyn InventoryCatalog>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            repository,
            stock,
            warehouses,
            inventory,
            sink,
            cache: TransferCache::new(),
            locks: TransferLocks::new(),
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn stock(&self) -> &Arc<dyn StockLevelStore> {
        &self.stock
    }

    pub fn cache(&self) -> &TransferCache {
        &self.cache
    }

    /// Creates a transfer in `pending`.
    ///
    /// Source availability is checked but only logged; stock is taken at
    /// ship time.
    #[tracing::instrument(
        skip(self, cmd),
        fields(from = %cmd.from_warehouse_id, to = %cmd.to_warehouse_id, lines = cmd.items.len())
    )]
    pub async fn create(&self, cmd: CreateTransfer) -> Result<StockTransfer, DomainError> {
        let result = self.create_inner(&cmd).await;
        self.record_outcome("create", &result);
        result
    }

    async fn create_inner(&self, cmd: &CreateTransfer) -> Result<StockTransfer, DomainError> {
        cmd.validate()?;

        for warehouse_id in [cmd.from_warehouse_id, cmd.to_warehouse_id] {
            if !self.warehouses.exists(warehouse_id).await? {
                return Err(DomainError::not_found("Warehouse", warehouse_id));
            }
        }

        let mut items = Vec::with_capacity(cmd.items.len());
        for line in &cmd.items {
            let item = self
                .inventory
                .get(line.inventory_item_id)
                .await?
                .ok_or_else(|| DomainError::not_found("InventoryItem", line.inventory_item_id))?;

            items.push(StockTransferItem::new(
                item.id,
                item.name,
                line.quantity,
                line.unit_price.unwrap_or(item.purchase_price),
                line.notes.clone(),
            )?);
        }

        self.warn_on_shortfall(cmd.from_warehouse_id, &items).await?;

        let now = Utc::now();
        let mut attempt = 0;
        let transfer = loop {
            let number = StockTransfer::number_for(now, self.next_serial());
            let transfer = StockTransfer::new(number, cmd, items.clone(), now)?;
            match self.repository.insert(&transfer).await {
                Ok(()) => break transfer,
                Err(DomainError::Conflict(reason)) if attempt + 1 < NUMBER_ATTEMPTS => {
                    tracing::debug!(%reason, attempt, "transfer number taken, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        self.cache.put(transfer.clone()).await;
        tracing::info!(
            transfer_id = %transfer.id,
            transfer_number = %transfer.transfer_number,
            total_value = %transfer.total_value,
            "transfer created"
        );
        self.publish(TransferEvent::TransferCreated(
            TransferEventData::for_transfer(&transfer, Some(cmd.created_by)),
        ))
        .await;

        Ok(transfer)
    }

    #[tracing::instrument(skip(self))]
    pub async fn approve(
        &self,
        transfer_id: TransferId,
        approver: ActorId,
    ) -> Result<StockTransfer, DomainError> {
        self.transition(transfer_id, Transition::Approve, approver, None)
            .await
    }

    /// Takes every line out of the source warehouse in one atomic batch.
    ///
    /// On `InsufficientStock` the transfer keeps its prior status and the
    /// error lists every failing line.
    #[tracing::instrument(skip(self))]
    pub async fn ship(
        &self,
        transfer_id: TransferId,
        shipper: ActorId,
    ) -> Result<StockTransfer, DomainError> {
        self.transition(transfer_id, Transition::Ship, shipper, None)
            .await
    }

    /// Puts every line into the destination warehouse in one atomic batch.
    #[tracing::instrument(skip(self))]
    pub async fn receive(
        &self,
        transfer_id: TransferId,
        receiver: ActorId,
    ) -> Result<StockTransfer, DomainError> {
        self.transition(transfer_id, Transition::Receive, receiver, None)
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn complete(
        &self,
        transfer_id: TransferId,
        completer: ActorId,
    ) -> Result<StockTransfer, DomainError> {
        self.transition(transfer_id, Transition::Complete, completer, None)
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn cancel(
        &self,
        transfer_id: TransferId,
        actor: ActorId,
        reason: Option<String>,
    ) -> Result<StockTransfer, DomainError> {
        self.transition(transfer_id, Transition::Cancel, actor, reason)
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn reject(
        &self,
        transfer_id: TransferId,
        actor: ActorId,
        reason: Option<String>,
    ) -> Result<StockTransfer, DomainError> {
        self.transition(transfer_id, Transition::Reject, actor, reason)
            .await
    }

    /// Deletes a transfer that has not moved stock yet.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, transfer_id: TransferId) -> Result<StockTransfer, DomainError> {
        let guard = self.locks.acquire(transfer_id).await;
        let result = self.delete_inner(transfer_id).await;
        self.locks.release(transfer_id, guard).await;
        self.record_outcome(Transition::Delete.as_str(), &result);
        result
    }

    async fn delete_inner(&self, transfer_id: TransferId) -> Result<StockTransfer, DomainError> {
        let transfer = self.load(transfer_id).await?;
        transfer.ensure_can(Transition::Delete)?;

        if !self.repository.delete(transfer_id).await? {
            return Err(DomainError::not_found("Transfer", transfer_id));
        }

        self.cache.evict(transfer_id).await;

        self.publish(TransferEvent::TransferDeleted(
            TransferEventData::for_transfer(&transfer, None),
        ))
        .await;

        Ok(transfer)
    }

    /// Returns a transfer, reading through the cache.
    ///
    /// A miss loads under the transfer's lock so it cannot interleave with a
    /// transition or delete of the same transfer.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, transfer_id: TransferId) -> Result<StockTransfer, DomainError> {
        if let Some(transfer) = self.cache.get(transfer_id).await {
            return Ok(transfer);
        }

        let guard = self.locks.acquire(transfer_id).await;
        let result = self.load_into_cache(transfer_id).await;
        self.locks.release(transfer_id, guard).await;
        result
    }

    async fn load_into_cache(&self, transfer_id: TransferId) -> Result<StockTransfer, DomainError> {
        // Filled by whoever held the lock before us
        if let Some(transfer) = self.cache.get(transfer_id).await {
            return Ok(transfer);
        }

        let transfer = self.load(transfer_id).await?;
        self.cache.put(transfer.clone()).await;
        Ok(transfer)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list(&self, filter: TransferFilter) -> Result<Page<StockTransfer>, DomainError> {
        self.repository.list(&filter).await
    }

    pub async fn stats(&self) -> Result<TransferStats, DomainError> {
        self.repository.stats().await
    }

    // Direct stock operations

    /// Books goods into a warehouse outside of any transfer.
    #[tracing::instrument(skip(self))]
    pub async fn receive_stock(
        &self,
        item_id: ItemId,
        warehouse_id: WarehouseId,
        quantity: Decimal,
        actor: ActorId,
        reference: Option<String>,
    ) -> Result<Decimal, DomainError> {
        ensure_positive(quantity)?;
        self.apply_direct(item_id, warehouse_id, quantity, MovementKind::In, actor, reference)
            .await
    }

    /// Issues goods out of a warehouse outside of any transfer.
    #[tracing::instrument(skip(self))]
    pub async fn issue_stock(
        &self,
        item_id: ItemId,
        warehouse_id: WarehouseId,
        quantity: Decimal,
        actor: ActorId,
        reference: Option<String>,
    ) -> Result<Decimal, DomainError> {
        ensure_positive(quantity)?;
        self.apply_direct(item_id, warehouse_id, -quantity, MovementKind::Out, actor, reference)
            .await
    }

    /// Applies a signed correction to a stock level.
    #[tracing::instrument(skip(self))]
    pub async fn adjust_stock(
        &self,
        item_id: ItemId,
        warehouse_id: WarehouseId,
        delta: Decimal,
        actor: ActorId,
        reference: Option<String>,
    ) -> Result<Decimal, DomainError> {
        self.apply_direct(
            item_id,
            warehouse_id,
            delta,
            MovementKind::Adjustment,
            actor,
            reference,
        )
        .await
    }

    /// Sets the bin or shelf label of a known item in a known warehouse.
    #[tracing::instrument(skip(self))]
    pub async fn set_location(
        &self,
        item_id: ItemId,
        warehouse_id: WarehouseId,
        location: Option<String>,
    ) -> Result<StockLevel, DomainError> {
        self.ensure_stock_key(item_id, warehouse_id).await?;
        Ok(self
            .stock
            .set_location(item_id, warehouse_id, location)
            .await?)
    }

    async fn apply_direct(
        &self,
        item_id: ItemId,
        warehouse_id: WarehouseId,
        delta: Decimal,
        kind: MovementKind,
        actor: ActorId,
        reference: Option<String>,
    ) -> Result<Decimal, DomainError> {
        self.ensure_stock_key(item_id, warehouse_id).await?;

        let mut adjustment = StockAdjustment::new(item_id, warehouse_id, delta, kind).by(actor);
        if let Some(reference) = reference {
            adjustment = adjustment.with_reference(reference);
        }

        let quantities = self.stock.apply(vec![adjustment]).await?;
        quantities.last().copied().ok_or_else(|| {
            DomainError::Stock(StockStoreError::InvalidAdjustment(
                "store returned no quantity".to_string(),
            ))
        })
    }

    // Internals

    async fn ensure_stock_key(
        &self,
        item_id: ItemId,
        warehouse_id: WarehouseId,
    ) -> Result<(), DomainError> {
        if !self.warehouses.exists(warehouse_id).await? {
            return Err(DomainError::not_found("Warehouse", warehouse_id));
        }
        if self.inventory.get(item_id).await?.is_none() {
            return Err(DomainError::not_found("InventoryItem", item_id));
        }
        Ok(())
    }

    async fn transition(
        &self,
        transfer_id: TransferId,
        transition: Transition,
        actor: ActorId,
        reason: Option<String>,
    ) -> Result<StockTransfer, DomainError> {
        let guard = self.locks.acquire(transfer_id).await;
        let start = Instant::now();

        let result = self
            .run_transition(transfer_id, transition, actor, reason)
            .await;
        self.locks.release(transfer_id, guard).await;

        metrics::histogram!("transfer_transition_duration_seconds")
            .record(start.elapsed().as_secs_f64());
        self.record_outcome(transition.as_str(), &result);
        result
    }

    async fn run_transition(
        &self,
        transfer_id: TransferId,
        transition: Transition,
        actor: ActorId,
        reason: Option<String>,
    ) -> Result<StockTransfer, DomainError> {
        let current = self.load(transfer_id).await?;
        let expected_version = current.version;

        let mut next = current.clone();
        advance(&mut next, transition, actor, reason, Utc::now())?;

        let batch = match transition {
            Transition::Ship => Some(current.outbound_adjustments(actor)),
            Transition::Receive => Some(current.inbound_adjustments(actor)),
            _ => None,
        };

        if let Some(batch) = &batch {
            self.stock.apply(batch.clone()).await?;
        }

        if let Err(e) = self.repository.update(&next, expected_version).await {
            if let Some(batch) = batch {
                self.reverse(&next, batch).await;
            }
            return Err(e);
        }

        self.cache.put(next.clone()).await;
        tracing::info!(
            transfer_id = %next.id,
            transfer_number = %next.transfer_number,
            from = %current.status,
            to = %next.status,
            "transfer transitioned"
        );
        self.publish(TransferEvent::for_transition(
            transition,
            TransferEventData::for_transfer(&next, Some(actor)),
        ))
        .await;

        Ok(next)
    }

    /// Undoes a stock batch whose transfer could not be persisted.
    async fn reverse(&self, transfer: &StockTransfer, batch: Vec<StockAdjustment>) {
        let reversal: Vec<_> = batch.iter().rev().map(StockAdjustment::reversed).collect();
        if let Err(e) = self.stock.apply(reversal).await {
            tracing::error!(
                transfer_id = %transfer.id,
                transfer_number = %transfer.transfer_number,
                error = %e,
                "failed to reverse stock batch after persist failure"
            );
        }
    }

    async fn load(&self, transfer_id: TransferId) -> Result<StockTransfer, DomainError> {
        self.repository
            .get(transfer_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Transfer", transfer_id))
    }

    async fn warn_on_shortfall(
        &self,
        warehouse_id: WarehouseId,
        items: &[StockTransferItem],
    ) -> Result<(), DomainError> {
        for item in items {
            let available = self
                .stock
                .get_quantity(item.inventory_item_id, warehouse_id)
                .await?;
            if available < item.quantity {
                tracing::warn!(
                    item_id = %item.inventory_item_id,
                    warehouse_id = %warehouse_id,
                    %available,
                    requested = %item.quantity,
                    "insufficient stock at source for new transfer"
                );
            }
        }
        Ok(())
    }

    async fn publish(&self, event: TransferEvent) {
        let event_type = event.event_type();
        if let Err(e) = self.sink.publish(event).await {
            tracing::warn!(event_type, error = %e, "failed to publish transfer event");
        }
    }

    fn next_serial(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    fn record_outcome<T>(&self, transition: &'static str, result: &Result<T, DomainError>) {
        match result {
            Ok(_) => {
                metrics::counter!("transfer_transitions_total", "transition" => transition)
                    .increment(1);
            }
            Err(e) => {
                metrics::counter!("transfer_transition_failures_total", "transition" => transition)
                    .increment(1);
                tracing::warn!(transition, error = %e, "transfer operation failed");
            }
        }
    }
}

fn advance(
    transfer: &mut StockTransfer,
    transition: Transition,
    actor: ActorId,
    reason: Option<String>,
    now: DateTime<Utc>,
) -> Result<(), TransferError> {
    match transition {
        Transition::Approve => transfer.approve(actor, now),
        Transition::Ship => transfer.ship(actor, now),
        Transition::Receive => transfer.receive(actor, now),
        Transition::Complete => transfer.complete(actor, now),
        Transition::Cancel => transfer.cancel(actor, reason, now),
        Transition::Reject => transfer.reject(actor, reason, now),
        Transition::Delete => transfer.ensure_can(Transition::Delete),
    }
}

fn ensure_positive(quantity: Decimal) -> Result<(), DomainError> {
    if quantity <= Decimal::ZERO {
        return Err(StockStoreError::InvalidAdjustment(format!(
            "quantity {quantity} must be greater than zero"
        ))
        .into());
    }
    Ok(())
}
