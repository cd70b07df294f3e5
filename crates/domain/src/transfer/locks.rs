use std::collections::HashMap;
use std::sync::Arc;

use common::TransferId;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Entries above this count trigger a sweep of idle locks on release.
const SWEEP_THRESHOLD: usize = 1024;

/// Per-transfer in-process locks.
///
/// An entry lives only while some task holds or awaits it; `release` drops
/// it once the last holder is done.
#[derive(Clone, Default)]
pub struct TransferLocks {
    entries: Arc<Mutex<HashMap<TransferId, Arc<Mutex<()>>>>>,
}

impl TransferLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, transfer_id: TransferId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut entries = self.entries.lock().await;
            entries.entry(transfer_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    pub async fn release(&self, transfer_id: TransferId, guard: OwnedMutexGuard<()>) {
        let mut entries = self.entries.lock().await;
        drop(guard);

        // Only the map's own handle left: nobody holds or awaits this lock.
        if entries
            .get(&transfer_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            entries.remove(&transfer_id);
        }

        // Waiters that were cancelled never release their entry.
        if entries.len() > SWEEP_THRESHOLD {
            entries.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
