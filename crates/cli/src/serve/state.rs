//! Application state and rate limiting.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Instant;

use tokio::sync::Mutex;
use tracker_core::{Actor, SystemClock};
use tracker_storage::{JournalStore, Ledger};

use super::RATE_LIMIT_WINDOW_SECS;

/// Per-IP request windows: (request count, window start time).
type IpTracker = HashMap<IpAddr, (u64, Instant)>;

/// In-memory per-IP rate limiter with fixed one-minute windows.
pub(crate) struct RateLimiter {
    tracker: Mutex<IpTracker>,
    /// Maximum requests per window.
    pub(crate) max_requests: u64,
}

impl RateLimiter {
    pub(crate) fn new(max_requests: u64) -> Self {
        Self {
            tracker: Mutex::new(HashMap::new()),
            max_requests,
        }
    }

    /// Check if a request from the given IP is allowed.
    /// Returns Ok(()) if allowed, Err(retry_after_secs) if rate limited.
    pub(crate) async fn check(&self, ip: IpAddr) -> Result<(), u64> {
        self.check_at(ip, Instant::now()).await
    }

    async fn check_at(&self, ip: IpAddr, now: Instant) -> Result<(), u64> {
        let mut tracker = self.tracker.lock().await;

        // Forget callers whose window has closed.
        tracker.retain(|_, (_, start)| {
            now.saturating_duration_since(*start).as_secs() < RATE_LIMIT_WINDOW_SECS
        });

        let entry = tracker.entry(ip).or_insert((0, now));
        let elapsed = now.saturating_duration_since(entry.1).as_secs();

        entry.0 += 1;
        if entry.0 > self.max_requests {
            Err(RATE_LIMIT_WINDOW_SECS.saturating_sub(elapsed))
        } else {
            Ok(())
        }
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.tracker.lock().await.len()
    }
}

/// Who is calling, as resolved by the auth middleware.
#[derive(Debug, Clone)]
pub(crate) enum Caller {
    Anonymous,
    Principal(Actor),
}

/// Application state shared across request handlers.
pub(crate) struct AppState {
    /// The authoritative ledger.
    pub(crate) ledger: Ledger<JournalStore, SystemClock>,
    /// Per-IP rate limiter.
    pub(crate) rate_limiter: RateLimiter,
    /// Bearer token to actor identity.
    pub(crate) principals: HashMap<String, Actor>,
}
