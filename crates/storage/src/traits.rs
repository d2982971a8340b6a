use async_trait::async_trait;
use tracker_core::LedgerEvent;

use crate::error::StorageError;

/// Append-only persistence for ledger events.
///
/// Events are stored in the order they were appended and are never
/// rewritten or removed. [`crate::Ledger`] calls `append` while holding its
/// write lock, so implementations see appends one at a time.
///
/// ## Durability
///
/// `append` must not return `Ok` until the event would survive a restart
/// of the backend. If it returns `Err`, the event must not appear in a
/// later `load`.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` to be used in axum
/// application state and across async task boundaries.
#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    /// Read back every persisted event, oldest first.
    async fn load(&self) -> Result<Vec<LedgerEvent>, StorageError>;

    /// Persist one event at the end of the log.
    async fn append(&self, event: &LedgerEvent) -> Result<(), StorageError>;

    /// Number of persisted events.
    async fn event_count(&self) -> Result<usize, StorageError>;
}
