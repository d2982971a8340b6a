use std::future::Future;

use tracker_core::{NewUpdate, StageStatus};

use super::{actor, clock, make_events, mango, TestResult};
use crate::{Ledger, LedgerStore};

pub(super) async fn run_replay_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "replay",
        "open_empty_store_has_no_produces",
        open_empty_store_has_no_produces(factory).await,
    ));
    results.push(TestResult::from_result(
        "replay",
        "ledger_writes_reach_store",
        ledger_writes_reach_store(factory).await,
    ));
    results.push(TestResult::from_result(
        "replay",
        "reopen_restores_records_and_history",
        reopen_restores_records_and_history(factory).await,
    ));
    results.push(TestResult::from_result(
        "replay",
        "ids_continue_after_reopen",
        ids_continue_after_reopen(factory).await,
    ));
    results.push(TestResult::from_result(
        "replay",
        "open_replays_preloaded_events",
        open_replays_preloaded_events(factory).await,
    ));

    results
}

async fn open_empty_store_has_no_produces<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let ledger = Ledger::open(factory().await, clock())
        .await
        .map_err(|e| e.to_string())?;
    let total = ledger.total_produces().await;
    if total != 0 {
        return Err(format!("expected 0 produces, got {total}"));
    }
    Ok(())
}

/// Each successful mutation appends exactly one event.
async fn ledger_writes_reach_store<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let ledger = Ledger::open(factory().await, clock())
        .await
        .map_err(|e| e.to_string())?;
    let farm = actor("farm:a")?;
    let id = ledger
        .register_produce(&farm, mango())
        .await
        .map_err(|e| e.to_string())?;
    ledger
        .append_update(
            &farm,
            id,
            NewUpdate::new(StageStatus::Distributor, "shipped", "13.0,80.2"),
        )
        .await
        .map_err(|e| e.to_string())?;

    let count = ledger
        .store()
        .event_count()
        .await
        .map_err(|e| e.to_string())?;
    if count != 2 {
        return Err(format!("expected 2 persisted events, got {count}"));
    }
    Ok(())
}

/// Records, statuses and histories are identical after reopening.
async fn reopen_restores_records_and_history<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let ledger = Ledger::open(factory().await, clock())
        .await
        .map_err(|e| e.to_string())?;
    let farm = actor("farm:a")?;
    let retailer = actor("retailer:c")?;
    for _ in 0..3 {
        ledger
            .register_produce(&farm, mango())
            .await
            .map_err(|e| e.to_string())?;
    }
    for (status, action) in [
        (StageStatus::Distributor, "shipped"),
        (StageStatus::Retailer, "stocked"),
    ] {
        ledger
            .append_update(&retailer, 2, NewUpdate::new(status, action, "1,1"))
            .await
            .map_err(|e| e.to_string())?;
    }
    let record_before = ledger.get_produce(2).await.map_err(|e| e.to_string())?;
    let history_before = ledger.get_history(2).await.map_err(|e| e.to_string())?;

    let reopened = Ledger::open(ledger.into_store(), clock())
        .await
        .map_err(|e| e.to_string())?;
    if reopened.total_produces().await != 3 {
        return Err("total not restored".to_string());
    }
    let record_after = reopened.get_produce(2).await.map_err(|e| e.to_string())?;
    if record_after != record_before {
        return Err(format!("record changed: {record_before:?} -> {record_after:?}"));
    }
    if record_after.status != StageStatus::Retailer {
        return Err(format!("expected Retailer, got {}", record_after.status));
    }
    let history_after = reopened.get_history(2).await.map_err(|e| e.to_string())?;
    if history_after != history_before {
        return Err("history changed across reopen".to_string());
    }
    Ok(())
}

/// The id counter resumes from the replayed total.
async fn ids_continue_after_reopen<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let ledger = Ledger::open(factory().await, clock())
        .await
        .map_err(|e| e.to_string())?;
    let farm = actor("farm:a")?;
    for _ in 0..2 {
        ledger
            .register_produce(&farm, mango())
            .await
            .map_err(|e| e.to_string())?;
    }
    let reopened = Ledger::open(ledger.into_store(), clock())
        .await
        .map_err(|e| e.to_string())?;
    let id = reopened
        .register_produce(&farm, mango())
        .await
        .map_err(|e| e.to_string())?;
    if id != 3 {
        return Err(format!("expected id 3 after reopen, got {id}"));
    }
    Ok(())
}

/// Events appended directly to a store are what the ledger serves.
async fn open_replays_preloaded_events<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    for event in &make_events(2, 5)? {
        s.append(event).await.map_err(|e| e.to_string())?;
    }
    let ledger = Ledger::open(s, clock()).await.map_err(|e| e.to_string())?;
    let history = ledger.get_history(1).await.map_err(|e| e.to_string())?;
    if history.len() != 5 {
        return Err(format!("expected 5 updates, got {}", history.len()));
    }
    let record = ledger.get_produce(1).await.map_err(|e| e.to_string())?;
    let last = history.last().map(|u| u.status);
    if Some(record.status) != last {
        return Err(format!("status {} does not match last update", record.status));
    }
    Ok(())
}
