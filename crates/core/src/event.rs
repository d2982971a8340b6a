use serde::{Deserialize, Serialize};

use crate::record::{ProduceId, ProduceRecord, Update};

/// A validated, fully attributed registry mutation.
///
/// Events are what a durable store persists. Replaying the events of a
/// ledger in order rebuilds the exact registry state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerEvent {
    Registered { record: ProduceRecord },
    Updated { id: ProduceId, update: Update },
}

impl LedgerEvent {
    /// The produce this event belongs to.
    pub fn produce_id(&self) -> ProduceId {
        match self {
            LedgerEvent::Registered { record } => record.id,
            LedgerEvent::Updated { id, .. } => *id,
        }
    }

    pub fn timestamp(&self) -> u64 {
        match self {
            LedgerEvent::Registered { record } => record.registered_at,
            LedgerEvent::Updated { update, .. } => update.timestamp,
        }
    }
}
