//! Transfer status state machine.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The status of a stock transfer in its lifecycle.
///
/// State transitions:
/// ```text
/// Pending ──► Approved ──► InTransit ──► Received ──► Completed
///    │  │         │            ▲
///    │  └─────────┼────────────┘ (ship directly from pending)
///    └────────────┴──► Cancelled | Rejected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    /// Created, awaiting approval. Line items are still editable.
    #[default]
    Pending,

    /// Approved, stock not yet moved.
    Approved,

    /// Stock has left the source warehouse.
    #[serde(alias = "shipped")]
    InTransit,

    /// Stock has arrived at the destination warehouse.
    Received,

    /// Closed out (terminal state).
    Completed,

    /// Cancelled before any stock moved (terminal state).
    Cancelled,

    /// Rejected before any stock moved (terminal state).
    Rejected,
}

impl TransferStatus {
    pub const ALL: [TransferStatus; 7] = [
        TransferStatus::Pending,
        TransferStatus::Approved,
        TransferStatus::InTransit,
        TransferStatus::Received,
        TransferStatus::Completed,
        TransferStatus::Cancelled,
        TransferStatus::Rejected,
    ];

    /// Returns true if the transfer can be approved in this status.
    pub fn can_approve(&self) -> bool {
        matches!(self, TransferStatus::Pending)
    }

    /// Returns true if the transfer can be shipped in this status.
    pub fn can_ship(&self) -> bool {
        matches!(self, TransferStatus::Pending | TransferStatus::Approved)
    }

    /// Returns true if the transfer can be received in this status.
    pub fn can_receive(&self) -> bool {
        matches!(self, TransferStatus::InTransit)
    }

    /// Returns true if the transfer can be completed in this status.
    pub fn can_complete(&self) -> bool {
        matches!(self, TransferStatus::Received)
    }

    /// Returns true if the transfer can be cancelled or rejected in this status.
    pub fn can_close(&self) -> bool {
        matches!(self, TransferStatus::Pending | TransferStatus::Approved)
    }

    /// Returns true if the transfer can be deleted in this status.
    ///
    /// Same precondition as closing: stock has not moved yet.
    pub fn can_delete(&self) -> bool {
        self.can_close()
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferStatus::Completed | TransferStatus::Cancelled | TransferStatus::Rejected
        )
    }

    /// Returns the canonical status name.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Approved => "approved",
            TransferStatus::InTransit => "in_transit",
            TransferStatus::Received => "received",
            TransferStatus::Completed => "completed",
            TransferStatus::Cancelled => "cancelled",
            TransferStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransferStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransferStatus::Pending),
            "approved" => Ok(TransferStatus::Approved),
            "in_transit" | "shipped" => Ok(TransferStatus::InTransit),
            "received" => Ok(TransferStatus::Received),
            "completed" => Ok(TransferStatus::Completed),
            "cancelled" => Ok(TransferStatus::Cancelled),
            "rejected" => Ok(TransferStatus::Rejected),
            other => Err(format!("unknown transfer status: {other}")),
        }
    }
}

/// An operation requested against a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Approve,
    Ship,
    Receive,
    Complete,
    Cancel,
    Reject,
    Delete,
}

impl Transition {
    /// Returns true if this operation is legal from `status`.
    pub fn is_allowed_from(&self, status: TransferStatus) -> bool {
        match self {
            Transition::Approve => status.can_approve(),
            Transition::Ship => status.can_ship(),
            Transition::Receive => status.can_receive(),
            Transition::Complete => status.can_complete(),
            Transition::Cancel | Transition::Reject => status.can_close(),
            Transition::Delete => status.can_delete(),
        }
    }

    /// Status reached after this operation, if it leads to one.
    pub fn target(&self) -> Option<TransferStatus> {
        match self {
            Transition::Approve => Some(TransferStatus::Approved),
            Transition::Ship => Some(TransferStatus::InTransit),
            Transition::Receive => Some(TransferStatus::Received),
            Transition::Complete => Some(TransferStatus::Completed),
            Transition::Cancel => Some(TransferStatus::Cancelled),
            Transition::Reject => Some(TransferStatus::Rejected),
            Transition::Delete => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::Approve => "approve",
            Transition::Ship => "ship",
            Transition::Receive => "receive",
            Transition::Complete => "complete",
            Transition::Cancel => "cancel",
            Transition::Reject => "reject",
            Transition::Delete => "delete",
        }
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
