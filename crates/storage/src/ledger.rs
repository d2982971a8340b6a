//! The single authoritative produce ledger.
//!
//! Writers are serialized by the write half of a `RwLock`; each mutation is
//! validated, persisted, and only then applied to the in-memory registry.
//! Readers share the read half and always see the state as of the last
//! completed mutation.

use tokio::sync::RwLock;
use tracing::{debug, info};
use tracker_core::{
    status_label, Actor, Clock, NewProduce, NewUpdate, ProduceId, ProduceRecord, ProduceView,
    Registry, RegistryError, SystemClock, Update,
};

use crate::error::LedgerError;
use crate::traits::LedgerStore;

pub struct Ledger<S: LedgerStore, C: Clock = SystemClock> {
    registry: RwLock<Registry<C>>,
    store: S,
}

impl<S: LedgerStore, C: Clock> Ledger<S, C> {
    /// Replay every event in `store` and open the ledger on top of it.
    pub async fn open(store: S, clock: C) -> Result<Self, LedgerError> {
        let events = store.load().await?;
        let count = events.len();
        let registry = Registry::replay(clock, events)?;
        info!(
            events = count,
            produces = registry.total_produces(),
            "ledger replayed"
        );
        Ok(Ledger {
            registry: RwLock::new(registry),
            store,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Give back the store, e.g. to reopen the ledger over it.
    pub fn into_store(self) -> S {
        self.store
    }

    pub async fn register_produce(
        &self,
        actor: &Actor,
        produce: NewProduce,
    ) -> Result<ProduceId, LedgerError> {
        let mut registry = self.registry.write().await;
        let event = registry
            .prepare_registration(actor, produce)
            .inspect_err(|e| debug!(actor = %actor, error = %e, "registration rejected"))?;
        let id = event.produce_id();
        let at = event.timestamp();

        self.store.append(&event).await?;
        registry.apply(event)?;

        info!(id, actor = %actor, at, "produce registered");
        Ok(id)
    }

    /// Append an update and return it as committed, with its assigned
    /// timestamp and actor.
    pub async fn append_update(
        &self,
        actor: &Actor,
        id: ProduceId,
        update: NewUpdate,
    ) -> Result<Update, LedgerError> {
        let mut registry = self.registry.write().await;
        let code = update.status;
        let event = registry.prepare_update(actor, id, update).inspect_err(|e| {
            debug!(id, actor = %actor, status = status_label(code), error = %e, "update rejected")
        })?;

        self.store.append(&event).await?;
        registry.apply(event)?;

        let committed = registry
            .latest_update(id)?
            .cloned()
            .ok_or(RegistryError::NotFound { id })?;
        info!(id, actor = %actor, status = %committed.status, "update appended");
        Ok(committed)
    }

    pub async fn get_produce(&self, id: ProduceId) -> Result<ProduceRecord, LedgerError> {
        let registry = self.registry.read().await;
        Ok(registry.get_produce(id)?.clone())
    }

    pub async fn get_history(&self, id: ProduceId) -> Result<Vec<Update>, LedgerError> {
        let registry = self.registry.read().await;
        Ok(registry.get_history(id)?.to_vec())
    }

    pub async fn latest_update(&self, id: ProduceId) -> Result<Option<Update>, LedgerError> {
        let registry = self.registry.read().await;
        Ok(registry.latest_update(id)?.cloned())
    }

    pub async fn total_produces(&self) -> u64 {
        self.registry.read().await.total_produces()
    }

    pub async fn produces(&self, offset: u64, limit: usize) -> Vec<ProduceView> {
        self.registry.read().await.produces(offset, limit)
    }
}
