use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracker_core::LedgerEvent;

/// `prev_hash` of the first journal entry.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// One line of the journal file.
///
/// `hash` covers `prev_hash` and the event's JSON encoding, chaining every
/// entry to all entries before it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// 1-based position in the journal.
    pub seq: u64,
    pub prev_hash: String,
    pub hash: String,
    pub event: LedgerEvent,
}

impl JournalEntry {
    /// Build the entry that follows `prev_hash` at position `seq`.
    pub fn seal(seq: u64, prev_hash: &str, event: LedgerEvent) -> Result<Self, serde_json::Error> {
        let hash = chain_hash(prev_hash, &event)?;
        Ok(JournalEntry {
            seq,
            prev_hash: prev_hash.to_string(),
            hash,
            event,
        })
    }

    /// Recompute the hash and compare it to the stored one.
    pub fn verify(&self) -> Result<bool, serde_json::Error> {
        Ok(chain_hash(&self.prev_hash, &self.event)? == self.hash)
    }
}

fn chain_hash(prev_hash: &str, event: &LedgerEvent) -> Result<String, serde_json::Error> {
    let body = serde_json::to_vec(event)?;
    let mut hasher = Sha256::new();
    hasher.update(prev_hash.as_bytes());
    hasher.update(b"\n");
    hasher.update(&body);
    Ok(hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect())
}
