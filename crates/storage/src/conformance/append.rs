use std::future::Future;

use super::{make_events, TestResult};
use crate::LedgerStore;

pub(super) async fn run_append_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "append",
        "empty_store_loads_nothing",
        empty_store_loads_nothing(factory).await,
    ));
    results.push(TestResult::from_result(
        "append",
        "appended_events_load_in_order",
        appended_events_load_in_order(factory).await,
    ));
    results.push(TestResult::from_result(
        "append",
        "event_fields_preserved",
        event_fields_preserved(factory).await,
    ));
    results.push(TestResult::from_result(
        "append",
        "event_count_tracks_appends",
        event_count_tracks_appends(factory).await,
    ));
    results.push(TestResult::from_result(
        "append",
        "load_is_repeatable",
        load_is_repeatable(factory).await,
    ));
    results.push(TestResult::from_result(
        "append",
        "many_appends_keep_order",
        many_appends_keep_order(factory).await,
    ));

    results
}

/// A fresh store loads an empty event list and counts zero.
async fn empty_store_loads_nothing<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let events = s.load().await.map_err(|e| e.to_string())?;
    if !events.is_empty() {
        return Err(format!("expected no events, got {}", events.len()));
    }
    let count = s.event_count().await.map_err(|e| e.to_string())?;
    if count != 0 {
        return Err(format!("expected event_count 0, got {count}"));
    }
    Ok(())
}

/// Events come back in exactly the order they were appended.
async fn appended_events_load_in_order<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let events = make_events(3, 4)?;
    for event in &events {
        s.append(event).await.map_err(|e| e.to_string())?;
    }
    let loaded = s.load().await.map_err(|e| e.to_string())?;
    if loaded != events {
        return Err(format!(
            "loaded events differ from appended ({} vs {})",
            loaded.len(),
            events.len()
        ));
    }
    Ok(())
}

/// Actor, timestamp, status, action and location survive a round trip.
async fn event_fields_preserved<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let events = make_events(1, 1)?;
    for event in &events {
        s.append(event).await.map_err(|e| e.to_string())?;
    }
    let loaded = s.load().await.map_err(|e| e.to_string())?;
    match loaded.get(1) {
        Some(tracker_core::LedgerEvent::Updated { id, update }) => {
            if *id != 1 {
                return Err(format!("expected update for produce 1, got {id}"));
            }
            if update.actor.as_str() != "distributor:fresh-co" {
                return Err(format!("actor not preserved: {}", update.actor));
            }
            if update.action != "step-0" || update.location != "0.0,0.5" {
                return Err(format!(
                    "action/location not preserved: {} @ {}",
                    update.action, update.location
                ));
            }
            if update.timestamp != super::T0 + 1 {
                return Err(format!("timestamp not preserved: {}", update.timestamp));
            }
            Ok(())
        }
        other => Err(format!("expected an Updated event at index 1, got {other:?}")),
    }
}

/// `event_count` grows by one per append.
async fn event_count_tracks_appends<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    for (i, event) in make_events(2, 3)?.iter().enumerate() {
        s.append(event).await.map_err(|e| e.to_string())?;
        let count = s.event_count().await.map_err(|e| e.to_string())?;
        if count != i + 1 {
            return Err(format!("expected event_count {}, got {count}", i + 1));
        }
    }
    Ok(())
}

/// Loading does not consume or reorder anything.
async fn load_is_repeatable<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    for event in &make_events(2, 2)? {
        s.append(event).await.map_err(|e| e.to_string())?;
    }
    let first = s.load().await.map_err(|e| e.to_string())?;
    let second = s.load().await.map_err(|e| e.to_string())?;
    if first != second {
        return Err("two loads returned different events".to_string());
    }
    Ok(())
}

/// A longer history keeps insertion order with no deduplication.
async fn many_appends_keep_order<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let events = make_events(1, 100)?;
    for event in &events {
        s.append(event).await.map_err(|e| e.to_string())?;
    }
    let loaded = s.load().await.map_err(|e| e.to_string())?;
    if loaded.len() != 101 {
        return Err(format!("expected 101 events, got {}", loaded.len()));
    }
    if loaded != events {
        return Err("events reordered or altered".to_string());
    }
    Ok(())
}
