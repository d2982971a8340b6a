//! Conformance test suite for `LedgerStore` implementations.
//!
//! This module provides a backend-agnostic test suite that any `LedgerStore`
//! implementation can run to verify correctness. The suite covers:
//!
//! - **Append**: ordering, field preservation, event counts
//! - **Replay**: a `Ledger` reopened over the same store sees the same state
//! - **Error handling**: rejected calls are not persisted, inconsistent
//!   event streams refuse to open
//! - **Concurrency**: concurrent writers through one `Ledger` get dense,
//!   unique ids
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory function that
//! creates a fresh, empty store for each test:
//!
//! ```ignore
//! use tracker_storage::conformance::run_conformance_suite;
//!
//! #[tokio::test]
//! async fn sqlite_conformance() {
//!     let report = run_conformance_suite(|| async {
//!         create_test_sqlite_store().await
//!     }).await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod append;
mod concurrent;
mod error;
mod replay;

use std::fmt;
use std::future::Future;

use tracker_core::{Actor, LedgerEvent, ManualClock, NewProduce, NewUpdate, Registry, StageStatus};

use crate::LedgerStore;

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "append", "replay").
    pub category: String,
    /// Test name (e.g. "appended_events_load_in_order").
    pub name: String,
    /// Whether the test passed.
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn pass(category: &str, name: &str) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: true,
            message: None,
        }
    }

    fn fail(category: &str, name: &str, msg: String) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: false,
            message: Some(msg),
        }
    }

    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Self::pass(category, name),
            Err(msg) => Self::fail(category, name, msg),
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL [{}/{}]: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full conformance suite against a store backend.
///
/// The `factory` function is called once per test to create a fresh, empty
/// store, ensuring test isolation.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: LedgerStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.extend(append::run_append_tests(&factory).await);
    results.extend(replay::run_replay_tests(&factory).await);
    results.extend(error::run_error_tests(&factory).await);
    results.extend(concurrent::run_concurrent_tests(&factory).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

// ── Helpers: fixtures with sensible defaults ─────────────────────────────────

const T0: u64 = 1_700_000_000;

fn actor(identity: &str) -> Result<Actor, String> {
    Actor::new(identity).map_err(|e| e.to_string())
}

fn clock() -> ManualClock {
    ManualClock::new(T0)
}

fn mango() -> NewProduce {
    NewProduce::new("Mango", "India", 100, "12.9,77.6")
}

/// Build `produces` registrations followed by `updates` updates against
/// produce 1, each one second apart.
fn make_events(produces: usize, updates: usize) -> Result<Vec<LedgerEvent>, String> {
    let clock = clock();
    let mut reg = Registry::with_clock(clock.clone());
    let mut events = Vec::new();
    let farm = actor("farm:green-valley")?;
    let dist = actor("distributor:fresh-co")?;

    for i in 0..produces {
        let event = reg
            .prepare_registration(
                &farm,
                NewProduce::new(format!("Produce {i}"), "India", i as i64, "12.9,77.6"),
            )
            .map_err(|e| e.to_string())?;
        reg.apply(event.clone()).map_err(|e| e.to_string())?;
        events.push(event);
        clock.advance(1);
    }
    for i in 0..updates {
        let status = StageStatus::ALL[i % StageStatus::ALL.len()];
        let event = reg
            .prepare_update(
                &dist,
                1,
                NewUpdate::new(status, format!("step-{i}"), format!("{i}.0,{i}.5")),
            )
            .map_err(|e| e.to_string())?;
        reg.apply(event.clone()).map_err(|e| e.to_string())?;
        events.push(event);
        clock.advance(1);
    }
    Ok(events)
}
