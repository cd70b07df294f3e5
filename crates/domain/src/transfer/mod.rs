//! Stock transfer aggregate, workflow and persistence.

mod aggregate;
mod cache;
mod commands;
mod events;
mod items;
mod locks;
mod postgres;
mod query;
mod repository;
mod service;
mod state;

pub use aggregate::{StockTransfer, format_transfer_number};
pub use cache::TransferCache;
pub use commands::{CreateTransfer, NewTransferItem};
pub use events::{TransferEvent, TransferEventData};
pub use items::StockTransferItem;
pub use postgres::PostgresTransferRepository;
pub use query::{Page, TransferFilter, TransferStats};
pub use repository::{InMemoryTransferRepository, TransferRepository};
pub use service::TransferWorkflow;
pub use state::{TransferStatus, Transition};

use common::TransferId;
use thiserror::Error;

/// Errors raised by transfer validation and the status state machine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransferError {
    /// The transfer as a whole is malformed (e.g. same source and destination).
    #[error("Invalid transfer: {0}")]
    InvalidTransfer(String),

    /// A line item is malformed (empty list, non-positive quantity).
    #[error("Invalid line item: {0}")]
    InvalidLineItem(String),

    /// The requested operation is not legal from the current status.
    #[error("Invalid state transition: cannot {requested} transfer {transfer_id} in status {current}")]
    InvalidStateTransition {
        transfer_id: TransferId,
        current: TransferStatus,
        requested: Transition,
    },
}
