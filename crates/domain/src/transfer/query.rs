//! Transfer list filters, pagination and statistics.

use chrono::{DateTime, Utc};
use common::WarehouseId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{StockTransfer, TransferStatus};

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

/// Filter for listing transfers. Results are ordered newest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransferFilter {
    pub from_warehouse_id: Option<WarehouseId>,
    pub to_warehouse_id: Option<WarehouseId>,
    pub status: Option<TransferStatus>,
    /// Inclusive lower bound on `transfer_date`.
    pub start_date: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `transfer_date`.
    pub end_date: Option<DateTime<Utc>>,
    /// 1-based page number.
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl TransferFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_warehouse(mut self, warehouse_id: WarehouseId) -> Self {
        self.from_warehouse_id = Some(warehouse_id);
        self
    }

    pub fn to_warehouse(mut self, warehouse_id: WarehouseId) -> Self {
        self.to_warehouse_id = Some(warehouse_id);
        self
    }

    pub fn status(mut self, status: TransferStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn between(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn paginate(mut self, page: u32, limit: u32) -> Self {
        self.page = Some(page);
        self.limit = Some(limit);
        self
    }

    /// Effective page number, at least 1.
    pub fn page_number(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Effective page size, between 1 and 100.
    pub fn page_size(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page_number() - 1) * u64::from(self.page_size())
    }

    /// Returns true if a transfer passes every filter. Pagination is not
    /// considered here.
    pub fn matches(&self, transfer: &StockTransfer) -> bool {
        if let Some(from) = self.from_warehouse_id
            && transfer.from_warehouse_id != from
        {
            return false;
        }
        if let Some(to) = self.to_warehouse_id
            && transfer.to_warehouse_id != to
        {
            return false;
        }
        if let Some(status) = self.status
            && transfer.status != status
        {
            return false;
        }
        if let Some(start) = self.start_date
            && transfer.transfer_date < start
        {
            return false;
        }
        if let Some(end) = self.end_date
            && transfer.transfer_date > end
        {
            return false;
        }
        true
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page: u32, limit: u32, total: u64) -> Self {
        let total_pages = total.div_ceil(u64::from(limit.max(1)));
        Self {
            items,
            page,
            limit,
            total,
            total_pages,
            has_next: u64::from(page) < total_pages,
            has_prev: page > 1,
        }
    }
}

/// Transfer counts by status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferStats {
    pub total: u64,
    pub pending: u64,
    pub approved: u64,
    pub in_transit: u64,
    pub received: u64,
    pub completed: u64,
    pub cancelled: u64,
    pub rejected: u64,
    /// Sum of `total_value` over completed transfers.
    pub completed_value: Decimal,
}

impl TransferStats {
    /// Adds `count` transfers in `status` whose values sum to `value`.
    pub fn record(&mut self, status: TransferStatus, count: u64, value: Decimal) {
        self.total += count;
        match status {
            TransferStatus::Pending => self.pending += count,
            TransferStatus::Approved => self.approved += count,
            TransferStatus::InTransit => self.in_transit += count,
            TransferStatus::Received => self.received += count,
            TransferStatus::Completed => {
                self.completed += count;
                self.completed_value = self.completed_value.saturating_add(value);
            }
            TransferStatus::Cancelled => self.cancelled += count,
            TransferStatus::Rejected => self.rejected += count,
        }
    }
}
