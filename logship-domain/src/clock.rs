//! Wall-clock abstraction.
//!
//! Event timestamps come from a `Clock` so tests can pin and advance time.

use chrono::{DateTime, Duration, Utc};
use std::sync::RwLock;

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync {
    /// Current time
    fn now(&self) -> DateTime<Utc>;

    /// Current time in milliseconds since the Unix epoch
    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests.
#[derive(Debug)]
pub struct MockClock {
    now: RwLock<DateTime<Utc>>,
}

impl MockClock {
    /// Clock frozen at `time`
    pub fn with_time(time: DateTime<Utc>) -> Self {
        Self { now: RwLock::new(time) }
    }

    /// Clock frozen at the current time
    pub fn new() -> Self {
        Self::with_time(Utc::now())
    }

    /// Move the clock forward (or backward, with a negative duration)
    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.write().unwrap_or_else(|e| e.into_inner());
        *now += duration;
    }

    /// Jump to an absolute time
    pub fn set_time(&self, time: DateTime<Utc>) {
        *self.now.write().unwrap_or_else(|e| e.into_inner()) = time;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_mock_clock_advance() {
        let start = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let clock = MockClock::with_time(start);

        clock.advance(Duration::milliseconds(250));

        assert_eq!(clock.now_millis(), 1_700_000_000_250);
    }

    #[test]
    fn test_system_clock_is_recent() {
        assert!(SystemClock.now_millis() > 1_600_000_000_000);
    }
}
