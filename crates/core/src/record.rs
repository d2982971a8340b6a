use serde::{Deserialize, Serialize};

use crate::actor::Actor;
use crate::status::StageStatus;

/// Produce identifiers are dense and start at 1.
pub type ProduceId = u64;

/// A registered produce item.
///
/// Everything except `status` is fixed at registration. `status` mirrors the
/// most recent update, or stays `Farm` while the history is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProduceRecord {
    pub id: ProduceId,
    pub name: String,
    pub origin: String,
    /// Smallest currency unit.
    pub price: u64,
    pub status: StageStatus,
    /// Location supplied at registration, conventionally `"lat,lon"`.
    pub location: String,
    pub registered_by: Actor,
    /// Seconds since the Unix epoch.
    pub registered_at: u64,
}

/// One custody/status event in a produce's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    pub status: StageStatus,
    pub action: String,
    /// Opaque position text, conventionally `"lat,lon"`.
    pub location: String,
    pub actor: Actor,
    /// Seconds since the Unix epoch, assigned by the registry.
    pub timestamp: u64,
}

/// Registration request as received from a caller. Not yet validated.
///
/// Unknown fields are rejected when decoding, so a body cannot smuggle in
/// an `actor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewProduce {
    pub name: String,
    pub origin: String,
    pub price: i64,
    #[serde(default)]
    pub location: String,
}

impl NewProduce {
    pub fn new(
        name: impl Into<String>,
        origin: impl Into<String>,
        price: i64,
        location: impl Into<String>,
    ) -> Self {
        NewProduce {
            name: name.into(),
            origin: origin.into(),
            price,
            location: location.into(),
        }
    }
}

/// Update request as received from a caller. `status` is the raw wire code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewUpdate {
    pub status: i64,
    pub action: String,
    #[serde(default)]
    pub location: String,
}

impl NewUpdate {
    pub fn new(status: StageStatus, action: impl Into<String>, location: impl Into<String>) -> Self {
        NewUpdate {
            status: status.into(),
            action: action.into(),
            location: location.into(),
        }
    }

    /// Build a request from an undecoded status code.
    pub fn with_code(status: i64, action: impl Into<String>, location: impl Into<String>) -> Self {
        NewUpdate {
            status,
            action: action.into(),
            location: location.into(),
        }
    }
}

/// A produce record together with a summary of its history, returned by
/// range queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProduceView {
    pub record: ProduceRecord,
    pub history_len: usize,
    pub latest: Option<Update>,
}
