use async_trait::async_trait;
use tokio::sync::Mutex;
use tracker_core::LedgerEvent;

use crate::error::StorageError;
use crate::traits::LedgerStore;

/// In-process store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    events: Mutex<Vec<LedgerEvent>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with existing events, e.g. to replay a fixture.
    pub fn with_events(events: Vec<LedgerEvent>) -> Self {
        MemoryStore {
            events: Mutex::new(events),
        }
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn load(&self) -> Result<Vec<LedgerEvent>, StorageError> {
        Ok(self.events.lock().await.clone())
    }

    async fn append(&self, event: &LedgerEvent) -> Result<(), StorageError> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }

    async fn event_count(&self) -> Result<usize, StorageError> {
        Ok(self.events.lock().await.len())
    }
}
