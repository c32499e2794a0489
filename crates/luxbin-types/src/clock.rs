//! External time source
//!
//! The ledger never reads the wall clock on its own; every component receives
//! `now` from a `Clock` owned by the caller.

use std::sync::atomic::{AtomicU64, Ordering};

/// Seconds since the Unix epoch
pub type Timestamp = u64;

/// Length of one issuance day in seconds
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Index of the day containing `now`
pub fn day_index(now: Timestamp, day_length: u64) -> u64 {
    now / day_length.max(1)
}

/// Source of per-call timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        chrono::Utc::now().timestamp().max(0) as Timestamp
    }
}

/// Manually driven clock for simulations and tests
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: u64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_index() {
        assert_eq!(day_index(0, SECONDS_PER_DAY), 0);
        assert_eq!(day_index(SECONDS_PER_DAY - 1, SECONDS_PER_DAY), 0);
        assert_eq!(day_index(SECONDS_PER_DAY, SECONDS_PER_DAY), 1);
        // zero-length days are treated as one second long
        assert_eq!(day_index(42, 0), 42);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(100);
        clock.advance(50);
        assert_eq!(clock.now(), 150);
        clock.set(7);
        assert_eq!(clock.now(), 7);
    }
}
