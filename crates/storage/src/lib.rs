//! tracker-storage: durable backends and the serialized produce ledger.
//!
//! - [`LedgerStore`] -- append-only persistence of [`tracker_core::LedgerEvent`]s
//! - [`MemoryStore`] -- in-process backend
//! - [`JournalStore`] -- hash-chained JSON-lines file backend
//! - [`Ledger`] -- the single authoritative ledger: a registry behind a
//!   read/write lock, persisting each event before committing it
//! - [`conformance`] -- backend-agnostic test suite for store implementations

pub mod conformance;
mod error;
mod journal;
mod ledger;
mod memory;
mod record;
mod traits;

pub use error::{LedgerError, StorageError};
pub use journal::JournalStore;
pub use ledger::Ledger;
pub use memory::MemoryStore;
pub use record::{JournalEntry, GENESIS_HASH};
pub use traits::LedgerStore;
