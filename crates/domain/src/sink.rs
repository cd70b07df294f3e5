//! Fire-and-forget publication of transfer events.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::transfer::TransferEvent;

#[derive(Debug, Error)]
#[error("Event sink error: {0}")]
pub struct SinkError(pub String);

/// Receives a notification after every transfer status change.
///
/// Publishing failures are logged by the caller and never undo the change.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: TransferEvent) -> Result<(), SinkError>;
}

/// Sink that logs each event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn publish(&self, event: TransferEvent) -> Result<(), SinkError> {
        let data = event.data();
        tracing::info!(
            event_type = event.event_type(),
            transfer_id = %data.transfer_id,
            transfer_number = %data.transfer_number,
            actor = ?data.actor,
            "transfer event"
        );
        Ok(())
    }
}

/// Sink that records events in memory.
#[derive(Clone, Default)]
pub struct InMemoryEventSink {
    events: Arc<RwLock<Vec<TransferEvent>>>,
}

impl InMemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<TransferEvent> {
        self.events.read().await.clone()
    }

    /// Event type names in publication order.
    pub async fn event_types(&self) -> Vec<&'static str> {
        self.events
            .read()
            .await
            .iter()
            .map(TransferEvent::event_type)
            .collect()
    }
}

#[async_trait]
impl EventSink for InMemoryEventSink {
    async fn publish(&self, event: TransferEvent) -> Result<(), SinkError> {
        self.events.write().await.push(event);
        Ok(())
    }
}
