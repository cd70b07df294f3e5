//! Stock transfer aggregate.

use chrono::{DateTime, Datelike, Utc};
use common::{ActorId, TransferId, WarehouseId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stock_store::{MovementKind, StockAdjustment};

use super::{CreateTransfer, StockTransferItem, TransferError, TransferStatus, Transition};

/// Formats a human-readable transfer number, `ST-<year>-<6 digits>`.
pub fn format_transfer_number(year: i32, serial: u64) -> String {
    format!("ST-{year}-{:06}", serial % 1_000_000)
}

/// A request to move fixed quantities of items between two warehouses.
///
/// Status only moves forward through the lifecycle in [`TransferStatus`];
/// every transition stamps the acting user and its timestamp and bumps
/// `version`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockTransfer {
    pub id: TransferId,
    pub transfer_number: String,
    pub from_warehouse_id: WarehouseId,
    pub to_warehouse_id: WarehouseId,
    pub transfer_date: DateTime<Utc>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub status: TransferStatus,
    pub items: Vec<StockTransferItem>,
    /// Number of line items.
    pub total_items: u32,
    /// Sum of line totals.
    pub total_value: Decimal,

    pub created_by: ActorId,
    pub approved_by: Option<ActorId>,
    pub shipped_by: Option<ActorId>,
    pub received_by: Option<ActorId>,
    pub completed_by: Option<ActorId>,
    /// Who cancelled or rejected the transfer.
    pub closed_by: Option<ActorId>,
    pub close_reason: Option<String>,

    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,

    /// Optimistic concurrency counter. Starts at 1.
    pub version: i64,
}

impl StockTransfer {
    /// Builds a new `pending` transfer from a validated command and its
    /// priced line items.
    pub fn new(
        transfer_number: String,
        cmd: &CreateTransfer,
        items: Vec<StockTransferItem>,
        now: DateTime<Utc>,
    ) -> Result<Self, TransferError> {
        let total_value = items
            .iter()
            .try_fold(Decimal::ZERO, |total, item| total.checked_add(item.line_total))
            .ok_or_else(|| {
                TransferError::InvalidTransfer("total value is out of range".to_string())
            })?;

        Ok(Self {
            id: TransferId::new(),
            transfer_number,
            from_warehouse_id: cmd.from_warehouse_id,
            to_warehouse_id: cmd.to_warehouse_id,
            transfer_date: cmd.transfer_date.unwrap_or(now),
            reason: cmd.reason.clone(),
            notes: cmd.notes.clone(),
            status: TransferStatus::Pending,
            total_items: items.len() as u32,
            total_value,
            items,
            created_by: cmd.created_by,
            approved_by: None,
            shipped_by: None,
            received_by: None,
            completed_by: None,
            closed_by: None,
            close_reason: None,
            created_at: now,
            approved_at: None,
            shipped_at: None,
            received_at: None,
            completed_at: None,
            closed_at: None,
            updated_at: now,
            version: 1,
        })
    }

    /// Creates a transfer number for `now`, offset by `attempt` so a retry
    /// after a collision yields a different number.
    pub fn number_for(now: DateTime<Utc>, attempt: u64) -> String {
        let serial = now.timestamp_millis().unsigned_abs() + attempt;
        format_transfer_number(now.year(), serial)
    }

    /// Fails with `InvalidStateTransition` unless `transition` is legal from
    /// the current status.
    pub fn ensure_can(&self, transition: Transition) -> Result<(), TransferError> {
        if transition.is_allowed_from(self.status) {
            Ok(())
        } else {
            Err(TransferError::InvalidStateTransition {
                transfer_id: self.id,
                current: self.status,
                requested: transition,
            })
        }
    }

    /// Sum of `quantity * unit_price` over the line items.
    pub fn computed_total_value(&self) -> Decimal {
        self.items.iter().map(|i| i.quantity * i.unit_price).sum()
    }

    // Transitions

    pub fn approve(&mut self, actor: ActorId, now: DateTime<Utc>) -> Result<(), TransferError> {
        self.advance(Transition::Approve, now)?;
        self.approved_by = Some(actor);
        self.approved_at = Some(now);
        Ok(())
    }

    pub fn ship(&mut self, actor: ActorId, now: DateTime<Utc>) -> Result<(), TransferError> {
        self.advance(Transition::Ship, now)?;
        self.shipped_by = Some(actor);
        self.shipped_at = Some(now);
        Ok(())
    }

    pub fn receive(&mut self, actor: ActorId, now: DateTime<Utc>) -> Result<(), TransferError> {
        self.advance(Transition::Receive, now)?;
        self.received_by = Some(actor);
        self.received_at = Some(now);
        Ok(())
    }

    pub fn complete(&mut self, actor: ActorId, now: DateTime<Utc>) -> Result<(), TransferError> {
        self.advance(Transition::Complete, now)?;
        self.completed_by = Some(actor);
        self.completed_at = Some(now);
        Ok(())
    }

    pub fn cancel(
        &mut self,
        actor: ActorId,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), TransferError> {
        self.close(Transition::Cancel, actor, reason, now)
    }

    pub fn reject(
        &mut self,
        actor: ActorId,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), TransferError> {
        self.close(Transition::Reject, actor, reason, now)
    }

    fn close(
        &mut self,
        transition: Transition,
        actor: ActorId,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), TransferError> {
        self.advance(transition, now)?;
        self.closed_by = Some(actor);
        self.close_reason = reason;
        self.closed_at = Some(now);
        Ok(())
    }

    fn advance(&mut self, transition: Transition, now: DateTime<Utc>) -> Result<(), TransferError> {
        self.ensure_can(transition)?;
        if let Some(target) = transition.target() {
            self.status = target;
        }
        self.updated_at = now;
        self.version += 1;
        Ok(())
    }

    // Stock batches

    /// Decrements at the source for every line, as applied by `ship`.
    pub fn outbound_adjustments(&self, actor: ActorId) -> Vec<StockAdjustment> {
        self.items
            .iter()
            .map(|item| {
                StockAdjustment::new(
                    item.inventory_item_id,
                    self.from_warehouse_id,
                    -item.quantity,
                    MovementKind::TransferOut,
                )
                .with_reference(self.transfer_number.clone())
                .by(actor)
            })
            .collect()
    }

    /// Increments at the destination for every line, as applied by `receive`.
    pub fn inbound_adjustments(&self, actor: ActorId) -> Vec<StockAdjustment> {
        self.items
            .iter()
            .map(|item| {
                StockAdjustment::new(
                    item.inventory_item_id,
                    self.to_warehouse_id,
                    item.quantity,
                    MovementKind::TransferIn,
                )
                .with_reference(self.transfer_number.clone())
                .by(actor)
            })
            .collect()
    }
}
