//! The produce registry state machine.
//!
//! Two tables indexed by id: produce records and their update histories.
//! Ids are dense (`1..=total_produces`) and never reused; histories are
//! append-only. Mutations are split into a pure `prepare_*` step that
//! validates and produces a [`LedgerEvent`], and [`Registry::apply`] which
//! commits it. A store can persist the event in between.

use crate::actor::Actor;
use crate::clock::{Clock, SystemClock};
use crate::error::RegistryError;
use crate::event::LedgerEvent;
use crate::record::{NewProduce, NewUpdate, ProduceId, ProduceRecord, ProduceView, Update};
use crate::status::StageStatus;

/// Status assigned to every produce at registration.
pub const INITIAL_STATUS: StageStatus = StageStatus::Farm;

#[derive(Debug)]
pub struct Registry<C: Clock = SystemClock> {
    records: Vec<ProduceRecord>,
    histories: Vec<Vec<Update>>,
    clock: C,
}

impl Registry<SystemClock> {
    pub fn new() -> Self {
        Registry::with_clock(SystemClock)
    }
}

impl Default for Registry<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Registry<C> {
    pub fn with_clock(clock: C) -> Self {
        Registry {
            records: Vec::new(),
            histories: Vec::new(),
            clock,
        }
    }

    /// Rebuild a registry from a persisted event stream, in order.
    pub fn replay<I>(clock: C, events: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = LedgerEvent>,
    {
        let mut registry = Registry::with_clock(clock);
        for event in events {
            registry.apply(event)?;
        }
        Ok(registry)
    }

    /// Count of registered produce records; also the highest valid id.
    pub fn total_produces(&self) -> u64 {
        self.records.len() as u64
    }

    fn index(&self, id: ProduceId) -> Result<usize, RegistryError> {
        if id == 0 || id > self.total_produces() {
            return Err(RegistryError::NotFound { id });
        }
        Ok((id - 1) as usize)
    }

    // ── Mutations ────────────────────────────────────────────────────────

    /// Validate a registration and build its event without changing state.
    pub fn prepare_registration(
        &self,
        actor: &Actor,
        produce: NewProduce,
    ) -> Result<LedgerEvent, RegistryError> {
        require_text("name", &produce.name)?;
        require_text("origin", &produce.origin)?;
        let price = u64::try_from(produce.price).map_err(|_| {
            RegistryError::invalid("price", format!("must be >= 0, got {}", produce.price))
        })?;

        let record = ProduceRecord {
            id: self.total_produces() + 1,
            name: produce.name,
            origin: produce.origin,
            price,
            status: INITIAL_STATUS,
            location: produce.location,
            registered_by: actor.clone(),
            registered_at: self.clock.now(),
        };
        Ok(LedgerEvent::Registered { record })
    }

    /// Validate an update and build its event without changing state.
    ///
    /// The timestamp is the clock's current time, raised if necessary so it
    /// never precedes the latest timestamp already recorded for this produce.
    pub fn prepare_update(
        &self,
        actor: &Actor,
        id: ProduceId,
        update: NewUpdate,
    ) -> Result<LedgerEvent, RegistryError> {
        let idx = self.index(id)?;
        let status = StageStatus::from_code(update.status)?;
        require_text("action", &update.action)?;

        let floor = self.histories[idx]
            .last()
            .map(|u| u.timestamp)
            .unwrap_or(self.records[idx].registered_at);

        Ok(LedgerEvent::Updated {
            id,
            update: Update {
                status,
                action: update.action,
                location: update.location,
                actor: actor.clone(),
                timestamp: self.clock.now().max(floor),
            },
        })
    }

    /// Commit an event. Registrations must carry the next id in sequence
    /// and updates must target an existing produce.
    pub fn apply(&mut self, event: LedgerEvent) -> Result<(), RegistryError> {
        match event {
            LedgerEvent::Registered { record } => {
                let expected = self.total_produces() + 1;
                if record.id != expected {
                    return Err(RegistryError::OutOfSequence {
                        expected,
                        found: record.id,
                    });
                }
                self.records.push(record);
                self.histories.push(Vec::new());
            }
            LedgerEvent::Updated { id, update } => {
                let idx = self.index(id)?;
                self.records[idx].status = update.status;
                self.histories[idx].push(update);
            }
        }
        Ok(())
    }

    /// Register a new produce at `Farm` and return its id.
    ///
    /// History starts empty; the first entry comes from the first update.
    pub fn register_produce(
        &mut self,
        actor: &Actor,
        produce: NewProduce,
    ) -> Result<ProduceId, RegistryError> {
        let event = self.prepare_registration(actor, produce)?;
        let id = event.produce_id();
        self.apply(event)?;
        Ok(id)
    }

    /// Append an update to a produce's history and move its status.
    ///
    /// Any defined stage may follow any other.
    pub fn append_update(
        &mut self,
        actor: &Actor,
        id: ProduceId,
        update: NewUpdate,
    ) -> Result<(), RegistryError> {
        let event = self.prepare_update(actor, id, update)?;
        self.apply(event)
    }

    // ── Queries ──────────────────────────────────────────────────────────

    pub fn get_produce(&self, id: ProduceId) -> Result<&ProduceRecord, RegistryError> {
        let idx = self.index(id)?;
        Ok(&self.records[idx])
    }

    /// Full history, oldest first.
    pub fn get_history(&self, id: ProduceId) -> Result<&[Update], RegistryError> {
        let idx = self.index(id)?;
        Ok(&self.histories[idx])
    }

    pub fn latest_update(&self, id: ProduceId) -> Result<Option<&Update>, RegistryError> {
        Ok(self.get_history(id)?.last())
    }

    /// Up to `limit` produces in id order, skipping the first `offset`.
    pub fn produces(&self, offset: u64, limit: usize) -> Vec<ProduceView> {
        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        self.records
            .iter()
            .zip(&self.histories)
            .skip(start)
            .take(limit)
            .map(|(record, history)| ProduceView {
                record: record.clone(),
                history_len: history.len(),
                latest: history.last().cloned(),
            })
            .collect()
    }
}

fn require_text(field: &'static str, value: &str) -> Result<(), RegistryError> {
    if value.trim().is_empty() {
        return Err(RegistryError::invalid(field, "must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::ErrorKind;

    fn farm() -> Actor {
        Actor::new("farm:green-valley").unwrap()
    }

    fn distributor() -> Actor {
        Actor::new("distributor:fresh-co").unwrap()
    }

    fn registry() -> (Registry<ManualClock>, ManualClock) {
        let clock = ManualClock::new(1_700_000_000);
        (Registry::with_clock(clock.clone()), clock)
    }

    fn mango() -> NewProduce {
        NewProduce::new("Mango", "India", 100, "12.9,77.6")
    }

    #[test]
    fn ids_start_at_one_and_match_total() {
        let (mut reg, _) = registry();
        assert_eq!(reg.total_produces(), 0);
        for expected in 1..=5 {
            let id = reg.register_produce(&farm(), mango()).unwrap();
            assert_eq!(id, expected);
            assert_eq!(reg.total_produces(), id);
        }
    }

    #[test]
    fn registration_sets_farm_status_and_empty_history() {
        let (mut reg, clock) = registry();
        let id = reg.register_produce(&farm(), mango()).unwrap();
        let record = reg.get_produce(id).unwrap();
        assert_eq!(record.name, "Mango");
        assert_eq!(record.origin, "India");
        assert_eq!(record.price, 100);
        assert_eq!(record.status, StageStatus::Farm);
        assert_eq!(record.location, "12.9,77.6");
        assert_eq!(record.registered_by, farm());
        assert_eq!(record.registered_at, clock.now());
        assert!(reg.get_history(id).unwrap().is_empty());
        assert!(reg.latest_update(id).unwrap().is_none());
    }

    #[test]
    fn rejected_registration_consumes_no_id() {
        let (mut reg, _) = registry();
        let err = reg
            .register_produce(&farm(), NewProduce::new("", "X", 10, "0,0"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(reg.total_produces(), 0);
        assert_eq!(reg.register_produce(&farm(), mango()).unwrap(), 1);
    }

    #[test]
    fn registration_validates_each_field() {
        let (mut reg, _) = registry();
        let cases = [
            (NewProduce::new("", "India", 1, ""), "name"),
            (NewProduce::new("  ", "India", 1, ""), "name"),
            (NewProduce::new("Mango", "", 1, ""), "origin"),
            (NewProduce::new("Mango", "India", -1, ""), "price"),
        ];
        for (request, field) in cases {
            match reg.register_produce(&farm(), request) {
                Err(RegistryError::InvalidArgument { field: f, .. }) => assert_eq!(f, field),
                other => panic!("expected InvalidArgument on {field}, got {other:?}"),
            }
        }
        assert_eq!(reg.total_produces(), 0);
    }

    #[test]
    fn zero_price_and_empty_location_are_accepted() {
        let (mut reg, _) = registry();
        let id = reg
            .register_produce(&farm(), NewProduce::new("Kale", "Kenya", 0, ""))
            .unwrap();
        assert_eq!(reg.get_produce(id).unwrap().price, 0);
    }

    #[test]
    fn shipped_scenario() {
        let (mut reg, _) = registry();
        let id = reg.register_produce(&farm(), mango()).unwrap();
        assert_eq!(id, 1);
        assert_eq!(reg.total_produces(), 1);

        reg.append_update(&distributor(), 1, NewUpdate::with_code(1, "shipped", "13.0,80.2"))
            .unwrap();

        let history = reg.get_history(1).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, StageStatus::Distributor);
        assert_eq!(history[0].action, "shipped");
        assert_eq!(history[0].location, "13.0,80.2");
        assert_eq!(history[0].actor, distributor());
        assert_eq!(reg.get_produce(1).unwrap().status, StageStatus::Distributor);
    }

    #[test]
    fn update_on_missing_id_is_not_found() {
        let (mut reg, _) = registry();
        reg.register_produce(&farm(), mango()).unwrap();
        for id in [0, 2, u64::MAX] {
            let err = reg
                .append_update(&farm(), id, NewUpdate::new(StageStatus::Retailer, "x", ""))
                .unwrap_err();
            assert_eq!(err, RegistryError::NotFound { id });
        }
        assert!(reg.get_history(1).unwrap().is_empty());
    }

    #[test]
    fn update_rejects_unknown_status_and_empty_action() {
        let (mut reg, _) = registry();
        let id = reg.register_produce(&farm(), mango()).unwrap();

        let err = reg
            .append_update(&farm(), id, NewUpdate::with_code(4, "shipped", ""))
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidArgument { field: "status", .. }));

        let err = reg
            .append_update(&farm(), id, NewUpdate::with_code(-1, "shipped", ""))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = reg
            .append_update(&farm(), id, NewUpdate::new(StageStatus::Retailer, "", ""))
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidArgument { field: "action", .. }));

        assert!(reg.get_history(id).unwrap().is_empty());
        assert_eq!(reg.get_produce(id).unwrap().status, StageStatus::Farm);
    }

    #[test]
    fn transitions_are_unconstrained() {
        let (mut reg, _) = registry();
        let id = reg.register_produce(&farm(), mango()).unwrap();
        for status in [
            StageStatus::Consumer,
            StageStatus::Farm,
            StageStatus::Retailer,
            StageStatus::Retailer,
            StageStatus::Distributor,
        ] {
            reg.append_update(&farm(), id, NewUpdate::new(status, "moved", ""))
                .unwrap();
            assert_eq!(reg.get_produce(id).unwrap().status, status);
        }
    }

    #[test]
    fn history_preserves_insertion_order_and_duplicates() {
        let (mut reg, clock) = registry();
        let id = reg.register_produce(&farm(), mango()).unwrap();
        let actions = ["harvested", "packed", "packed", "shipped", "received"];
        for action in actions {
            clock.advance(10);
            reg.append_update(&farm(), id, NewUpdate::new(StageStatus::Farm, action, "1,1"))
                .unwrap();
        }
        let history = reg.get_history(id).unwrap();
        let got: Vec<&str> = history.iter().map(|u| u.action.as_str()).collect();
        assert_eq!(got, actions);
    }

    #[test]
    fn timestamps_never_go_backwards() {
        let (mut reg, clock) = registry();
        let id = reg.register_produce(&farm(), mango()).unwrap();
        clock.advance(60);
        reg.append_update(&farm(), id, NewUpdate::new(StageStatus::Farm, "harvested", ""))
            .unwrap();
        clock.set(1_000);
        reg.append_update(&farm(), id, NewUpdate::new(StageStatus::Distributor, "shipped", ""))
            .unwrap();

        let history = reg.get_history(id).unwrap();
        assert_eq!(history[0].timestamp, 1_700_000_060);
        assert_eq!(history[1].timestamp, 1_700_000_060);
    }

    #[test]
    fn prepare_does_not_mutate() {
        let (reg, _) = registry();
        let event = reg.prepare_registration(&farm(), mango()).unwrap();
        assert_eq!(event.produce_id(), 1);
        assert_eq!(reg.total_produces(), 0);
    }

    #[test]
    fn apply_rejects_out_of_sequence_registration() {
        let (mut reg, _) = registry();
        let first = reg.prepare_registration(&farm(), mango()).unwrap();
        let stale = first.clone();
        reg.apply(first).unwrap();
        let err = reg.apply(stale).unwrap_err();
        assert_eq!(err, RegistryError::OutOfSequence { expected: 2, found: 1 });
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn replay_rebuilds_state() {
        let (mut reg, clock) = registry();
        let mut events = Vec::new();
        for _ in 0..2 {
            let event = reg.prepare_registration(&farm(), mango()).unwrap();
            events.push(event.clone());
            reg.apply(event).unwrap();
        }
        let event = reg
            .prepare_update(&distributor(), 2, NewUpdate::new(StageStatus::Retailer, "stocked", ""))
            .unwrap();
        events.push(event.clone());
        reg.apply(event).unwrap();

        let rebuilt = Registry::replay(clock, events).unwrap();
        assert_eq!(rebuilt.total_produces(), 2);
        assert_eq!(rebuilt.get_produce(2).unwrap(), reg.get_produce(2).unwrap());
        assert_eq!(rebuilt.get_history(2).unwrap(), reg.get_history(2).unwrap());
    }

    #[test]
    fn produces_pages_in_id_order() {
        let (mut reg, _) = registry();
        for name in ["Apple", "Banana", "Cherry"] {
            reg.register_produce(&farm(), NewProduce::new(name, "Chile", 5, ""))
                .unwrap();
        }
        reg.append_update(&farm(), 2, NewUpdate::new(StageStatus::Retailer, "stocked", ""))
            .unwrap();

        let page = reg.produces(1, 10);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].record.name, "Banana");
        assert_eq!(page[0].history_len, 1);
        assert_eq!(page[0].latest.as_ref().unwrap().action, "stocked");
        assert_eq!(page[1].record.name, "Cherry");
        assert!(page[1].latest.is_none());

        assert!(reg.produces(3, 10).is_empty());
        assert_eq!(reg.produces(0, 1).len(), 1);
    }

    #[test]
    fn queries_on_missing_ids_are_not_found() {
        let (reg, _) = registry();
        assert_eq!(reg.get_produce(1).unwrap_err(), RegistryError::NotFound { id: 1 });
        assert_eq!(reg.get_history(0).unwrap_err(), RegistryError::NotFound { id: 0 });
    }
}
