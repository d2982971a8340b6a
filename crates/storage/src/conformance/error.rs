use std::future::Future;

use tracker_core::{
    ErrorKind, LedgerEvent, ManualClock, NewProduce, NewUpdate, RegistryError, StageStatus,
};

use super::{actor, clock, make_events, mango, TestResult};
use crate::{Ledger, LedgerError, LedgerStore};

pub(super) async fn run_error_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "error",
        "invalid_registration_not_persisted",
        invalid_registration_not_persisted(factory).await,
    ));
    results.push(TestResult::from_result(
        "error",
        "update_unknown_id_not_persisted",
        update_unknown_id_not_persisted(factory).await,
    ));
    results.push(TestResult::from_result(
        "error",
        "unknown_status_not_persisted",
        unknown_status_not_persisted(factory).await,
    ));
    results.push(TestResult::from_result(
        "error",
        "open_rejects_out_of_sequence_registration",
        open_rejects_out_of_sequence_registration(factory).await,
    ));
    results.push(TestResult::from_result(
        "error",
        "open_rejects_update_before_registration",
        open_rejects_update_before_registration(factory).await,
    ));

    results
}

async fn expect_event_count<S: LedgerStore>(
    ledger: &Ledger<S, ManualClock>,
    expected: usize,
) -> Result<(), String> {
    let count = ledger
        .store()
        .event_count()
        .await
        .map_err(|e| e.to_string())?;
    if count != expected {
        return Err(format!("expected {expected} persisted events, got {count}"));
    }
    Ok(())
}

async fn invalid_registration_not_persisted<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let ledger = Ledger::open(factory().await, clock())
        .await
        .map_err(|e| e.to_string())?;
    let farm = actor("farm:a")?;
    match ledger
        .register_produce(&farm, NewProduce::new("", "X", 10, "0,0"))
        .await
    {
        Err(e) if e.kind() == Some(ErrorKind::InvalidArgument) => {}
        other => return Err(format!("expected InvalidArgument, got {other:?}")),
    }
    expect_event_count(&ledger, 0).await?;

    let id = ledger
        .register_produce(&farm, mango())
        .await
        .map_err(|e| e.to_string())?;
    if id != 1 {
        return Err(format!("rejected registration consumed an id: next id {id}"));
    }
    Ok(())
}

async fn update_unknown_id_not_persisted<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let ledger = Ledger::open(factory().await, clock())
        .await
        .map_err(|e| e.to_string())?;
    let farm = actor("farm:a")?;
    ledger
        .register_produce(&farm, mango())
        .await
        .map_err(|e| e.to_string())?;
    for id in [0, 2] {
        match ledger
            .append_update(&farm, id, NewUpdate::new(StageStatus::Retailer, "stocked", ""))
            .await
        {
            Err(LedgerError::Registry(RegistryError::NotFound { id: got })) if got == id => {}
            other => return Err(format!("expected NotFound for {id}, got {other:?}")),
        }
    }
    expect_event_count(&ledger, 1).await
}

async fn unknown_status_not_persisted<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let ledger = Ledger::open(factory().await, clock())
        .await
        .map_err(|e| e.to_string())?;
    let farm = actor("farm:a")?;
    ledger
        .register_produce(&farm, mango())
        .await
        .map_err(|e| e.to_string())?;
    match ledger
        .append_update(&farm, 1, NewUpdate::with_code(4, "teleported", ""))
        .await
    {
        Err(e) if e.kind() == Some(ErrorKind::InvalidArgument) => {}
        other => return Err(format!("expected InvalidArgument, got {other:?}")),
    }
    expect_event_count(&ledger, 1).await
}

/// A registration whose id skips ahead cannot be replayed.
async fn open_rejects_out_of_sequence_registration<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut events = make_events(2, 0)?;
    let second = events.pop().ok_or("fixture produced no events")?;
    s.append(&second).await.map_err(|e| e.to_string())?;

    match Ledger::open(s, clock()).await {
        Err(LedgerError::Registry(RegistryError::OutOfSequence {
            expected: 1,
            found: 2,
        })) => Ok(()),
        Err(e) => Err(format!("expected OutOfSequence, got {e}")),
        Ok(_) => Err("ledger opened over an out-of-sequence store".to_string()),
    }
}

/// An update for a produce that was never registered cannot be replayed.
async fn open_rejects_update_before_registration<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let update = make_events(1, 1)?
        .into_iter()
        .find(|e| matches!(e, LedgerEvent::Updated { .. }))
        .ok_or("fixture produced no update")?;
    s.append(&update).await.map_err(|e| e.to_string())?;

    match Ledger::open(s, clock()).await {
        Err(e) if e.kind() == Some(ErrorKind::NotFound) => Ok(()),
        Err(e) => Err(format!("expected NotFound, got {e}")),
        Ok(_) => Err("ledger opened over an orphan update".to_string()),
    }
}
