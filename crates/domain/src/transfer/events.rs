//! Transfer status-change events.

use chrono::{DateTime, Utc};
use common::{ActorId, TransferId};
use serde::{Deserialize, Serialize};

use super::{StockTransfer, Transition};

/// Notification published after a transfer changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum TransferEvent {
    TransferCreated(TransferEventData),
    TransferApproved(TransferEventData),
    TransferShipped(TransferEventData),
    TransferReceived(TransferEventData),
    TransferCompleted(TransferEventData),
    TransferCancelled(TransferEventData),
    TransferRejected(TransferEventData),
    TransferDeleted(TransferEventData),
}

/// Payload shared by every transfer event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferEventData {
    pub transfer_id: TransferId,
    pub transfer_number: String,
    pub actor: Option<ActorId>,
    pub timestamp: DateTime<Utc>,
}

impl TransferEventData {
    pub fn for_transfer(transfer: &StockTransfer, actor: Option<ActorId>) -> Self {
        Self {
            transfer_id: transfer.id,
            transfer_number: transfer.transfer_number.clone(),
            actor,
            timestamp: Utc::now(),
        }
    }
}

impl TransferEvent {
    /// Event emitted after a successful `transition`.
    pub fn for_transition(transition: Transition, data: TransferEventData) -> Self {
        match transition {
            Transition::Approve => TransferEvent::TransferApproved(data),
            Transition::Ship => TransferEvent::TransferShipped(data),
            Transition::Receive => TransferEvent::TransferReceived(data),
            Transition::Complete => TransferEvent::TransferCompleted(data),
            Transition::Cancel => TransferEvent::TransferCancelled(data),
            Transition::Reject => TransferEvent::TransferRejected(data),
            Transition::Delete => TransferEvent::TransferDeleted(data),
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            TransferEvent::TransferCreated(_) => "TransferCreated",
            TransferEvent::TransferApproved(_) => "TransferApproved",
            TransferEvent::TransferShipped(_) => "TransferShipped",
            TransferEvent::TransferReceived(_) => "TransferReceived",
            TransferEvent::TransferCompleted(_) => "TransferCompleted",
            TransferEvent::TransferCancelled(_) => "TransferCancelled",
            TransferEvent::TransferRejected(_) => "TransferRejected",
            TransferEvent::TransferDeleted(_) => "TransferDeleted",
        }
    }

    pub fn data(&self) -> &TransferEventData {
        match self {
            TransferEvent::TransferCreated(data)
            | TransferEvent::TransferApproved(data)
            | TransferEvent::TransferShipped(data)
            | TransferEvent::TransferReceived(data)
            | TransferEvent::TransferCompleted(data)
            | TransferEvent::TransferCancelled(data)
            | TransferEvent::TransferRejected(data)
            | TransferEvent::TransferDeleted(data) => data,
        }
    }
}
