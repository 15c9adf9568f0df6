//! Ledger time source.
//!
//! `created_at` is ledger-assigned, never caller-supplied. The clock is a
//! seam so tests can pin time.

use std::sync::atomic::{AtomicI64, Ordering};

/// Source of ledger time (Unix milliseconds).
pub trait LedgerClock: Send + Sync {
    /// Current ledger time.
    fn now(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Default)]
pub struct SystemClock;

impl LedgerClock for SystemClock {
    fn now(&self) -> i64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_millis() as i64
    }
}

/// A pinned clock for deterministic tests. Advances only when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: AtomicI64,
}

impl FixedClock {
    /// Create a clock pinned at the given time.
    pub fn at(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    /// Advance the clock by `delta_ms`.
    pub fn advance(&self, delta_ms: i64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl LedgerClock for FixedClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
