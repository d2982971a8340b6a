use tracker_core::{ErrorKind, RegistryError};

/// All errors that can be returned by a `LedgerStore` implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("journal I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An event could not be encoded or decoded.
    #[error("journal serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The persisted journal fails verification: bad JSON, a sequence gap,
    /// or a broken hash chain. `line` is 1-based.
    #[error("journal corrupt at line {line}: {reason}")]
    Corrupt { line: usize, reason: String },

    /// Another store, usually in another process, has the journal open.
    #[error("journal {} is in use by another process", path.display())]
    Locked { path: std::path::PathBuf },

    /// A backend-specific storage error.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Errors surfaced by [`crate::Ledger`] operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The registry rejected the call. State is unchanged.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The event could not be persisted or loaded. State is unchanged.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl LedgerError {
    /// Registry error kind, or `None` for storage failures.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            LedgerError::Registry(e) => Some(e.kind()),
            LedgerError::Storage(_) => None,
        }
    }
}
