//! Domain layer for the stock transfer engine.
//!
//! This crate provides:
//! - `StockTransfer` aggregate with its status state machine
//! - `TransferWorkflow`, the service driving transfers and moving stock
//! - `TransferRepository` with in-memory and PostgreSQL backends
//! - read-only warehouse and inventory catalogs
//! - `EventSink` for fire-and-forget status notifications

pub mod catalog;
pub mod error;
pub mod sink;
pub mod transfer;

pub use catalog::{
    InMemoryInventoryCatalog, InMemoryWarehouseCatalog, InventoryCatalog, InventoryItem, Warehouse,
    WarehouseCatalog,
};
pub use error::DomainError;
pub use sink::{EventSink, InMemoryEventSink, SinkError, TracingEventSink};
pub use transfer::{
    CreateTransfer, InMemoryTransferRepository, NewTransferItem, Page, PostgresTransferRepository,
    StockTransfer, StockTransferItem, TransferCache, TransferError, TransferEvent,
    TransferEventData, TransferFilter, TransferRepository, TransferStats, TransferStatus,
    TransferWorkflow, Transition, format_transfer_number,
};
