/// Coarse classification of a [`RegistryError`], stable across messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    Conflict,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
        }
    }
}

/// All errors returned by the registry.
///
/// Every variant is raised before any state changes, so a failed call
/// leaves the registry exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Malformed or out-of-domain input: empty text, negative price,
    /// unrecognized status code.
    #[error("invalid argument '{field}': {reason}")]
    InvalidArgument { field: &'static str, reason: String },

    /// Identifier outside the allocated range `1..=total_produces`.
    #[error("produce not found: {id}")]
    NotFound { id: u64 },

    /// A replayed or prepared event does not follow the current ledger head.
    #[error("event out of sequence: expected produce {expected}, found {found}")]
    OutOfSequence { expected: u64, found: u64 },
}

impl RegistryError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        RegistryError::InvalidArgument {
            field,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            RegistryError::NotFound { .. } => ErrorKind::NotFound,
            RegistryError::OutOfSequence { .. } => ErrorKind::Conflict,
        }
    }
}
