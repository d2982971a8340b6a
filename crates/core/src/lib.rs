//! tracker-core: produce registry data model and state machine.
//!
//! The [`Registry`] owns every produce record and its append-only update
//! history. It allocates dense ids starting at 1, validates every mutation
//! before touching state, and answers point and range queries.
//!
//! # Public API
//!
//! - [`Registry`] -- the state machine; mutations go through
//!   [`Registry::register_produce`] and [`Registry::append_update`]
//! - [`LedgerEvent`] -- a validated, attributed mutation, the unit of
//!   persistence and replay
//! - [`StageStatus`] -- supply-chain stage codec (codes 0..=3)
//! - [`Actor`] -- resolved identity of the calling principal
//! - [`Clock`], [`SystemClock`], [`ManualClock`] -- timestamp sources
//! - [`RegistryError`], [`ErrorKind`] -- typed failures

/// Version of the persisted ledger event format.
pub const LEDGER_FORMAT_VERSION: &str = "1.0.0";

pub mod actor;
pub mod clock;
pub mod error;
pub mod event;
pub mod record;
pub mod registry;
pub mod status;

pub use actor::Actor;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ErrorKind, RegistryError};
pub use event::LedgerEvent;
pub use record::{NewProduce, NewUpdate, ProduceId, ProduceRecord, ProduceView, Update};
pub use registry::Registry;
pub use status::{status_label, StageStatus};
