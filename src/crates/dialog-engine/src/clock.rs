//! Injectable wall-clock, so interrupt timing and transition timestamps are
//! deterministic in tests (spec §9: "Clock ... injected providers").

use chrono::{DateTime, Utc};
use std::sync::Mutex;

/// Source of "now" for the engine. The default impl wraps [`Utc::now`];
/// tests use [`FixedClock`] or [`SteppedClock`] instead.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Real wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant. Useful for asserting on exact
/// `TransitionLogEntry::when` values in tests.
#[derive(Debug, Clone)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Advances by a fixed step on every call, so a test can assert ordering
/// without fighting `Utc::now()` resolution or sleeping in real time.
pub struct SteppedClock {
    next: Mutex<DateTime<Utc>>,
    step: chrono::Duration,
}

impl SteppedClock {
    pub fn new(start: DateTime<Utc>, step: chrono::Duration) -> Self {
        Self { next: Mutex::new(start), step }
    }
}

impl Clock for SteppedClock {
    fn now(&self) -> DateTime<Utc> {
        let mut guard = self.next.lock().expect("clock mutex poisoned");
        let current = *guard;
        *guard = current + self.step;
        current
    }
}
