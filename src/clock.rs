//! Time sources used to compute certificate validity windows.

use std::fmt::Debug;
use std::sync::Mutex;

use time::{Duration, OffsetDateTime};

/// A source of the current instant.
///
/// The authority only asks a clock for "now" when it computes the start of a
/// certificate's validity window, so tests can pin issuance to a known time.
pub trait Clock: Send + Sync + Debug {
    /// Returns the current instant.
    fn now(&self) -> OffsetDateTime;
}

/// Wall-clock time in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FakeClock {
    now: Mutex<OffsetDateTime>,
}

impl FakeClock {
    /// Midnight UTC, 4 April 2024.
    const DEFAULT_UNIX_TIMESTAMP: i64 = 1_712_188_800;

    /// Creates a clock frozen at a fixed, whole-second instant.
    pub fn new() -> Self {
        let start = OffsetDateTime::from_unix_timestamp(Self::DEFAULT_UNIX_TIMESTAMP)
            .unwrap_or(OffsetDateTime::UNIX_EPOCH);
        Self::at(start)
    }

    /// Creates a clock frozen at `now`.
    pub fn at(now: OffsetDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Moves the clock forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += duration;
    }

    /// Moves the clock to `instant`.
    pub fn set(&self, instant: OffsetDateTime) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = instant;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
