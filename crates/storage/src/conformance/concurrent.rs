use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use tracker_core::{NewUpdate, StageStatus};

use super::{actor, clock, mango, TestResult};
use crate::{Ledger, LedgerStore};

/// Number of concurrent tasks to spawn in each test.
const N: usize = 10;

pub(super) async fn run_concurrent_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "concurrent",
        "concurrent_registrations_get_dense_ids",
        concurrent_registrations_get_dense_ids(factory).await,
    ));
    results.push(TestResult::from_result(
        "concurrent",
        "concurrent_updates_all_recorded",
        concurrent_updates_all_recorded(factory).await,
    ));

    results
}

/// N tasks register at once. Every task gets a distinct id and together
/// they cover exactly `1..=N`.
///
/// This exercises real concurrency: `tokio::spawn` creates parallel tasks
/// that race for the ledger's write lock.
async fn concurrent_registrations_get_dense_ids<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let ledger = Arc::new(
        Ledger::open(factory().await, clock())
            .await
            .map_err(|e| e.to_string())?,
    );
    let farm = actor("farm:a")?;

    let mut handles = Vec::new();
    for _ in 0..N {
        let l = ledger.clone();
        let a = farm.clone();
        handles.push(tokio::spawn(async move { l.register_produce(&a, mango()).await }));
    }

    let mut ids = BTreeSet::new();
    for handle in handles {
        let id = handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e| format!("ledger error: {e}"))?;
        ids.insert(id);
    }

    let expected: BTreeSet<u64> = (1..=N as u64).collect();
    if ids != expected {
        return Err(format!("expected ids 1..={N}, got {ids:?}"));
    }
    let count = ledger
        .store()
        .event_count()
        .await
        .map_err(|e| e.to_string())?;
    if count != N {
        return Err(format!("expected {N} persisted events, got {count}"));
    }
    Ok(())
}

/// N tasks append to the same produce. No update is lost and the status
/// equals the last entry of the history.
async fn concurrent_updates_all_recorded<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let ledger = Arc::new(
        Ledger::open(factory().await, clock())
            .await
            .map_err(|e| e.to_string())?,
    );
    let farm = actor("farm:a")?;
    let id = ledger
        .register_produce(&farm, mango())
        .await
        .map_err(|e| e.to_string())?;

    let mut handles = Vec::new();
    for i in 0..N {
        let l = ledger.clone();
        let a = farm.clone();
        handles.push(tokio::spawn(async move {
            let status = StageStatus::ALL[i % StageStatus::ALL.len()];
            l.append_update(&a, id, NewUpdate::new(status, format!("step-{i}"), ""))
                .await
        }));
    }
    for handle in handles {
        handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e| format!("ledger error: {e}"))?;
    }

    let history = ledger.get_history(id).await.map_err(|e| e.to_string())?;
    if history.len() != N {
        return Err(format!("expected {N} updates, got {}", history.len()));
    }
    let actions: BTreeSet<&str> = history.iter().map(|u| u.action.as_str()).collect();
    if actions.len() != N {
        return Err("duplicate or missing actions in history".to_string());
    }
    let record = ledger.get_produce(id).await.map_err(|e| e.to_string())?;
    if history.last().map(|u| u.status) != Some(record.status) {
        return Err("status does not match last update".to_string());
    }
    Ok(())
}
