//! Injectable time source.

use jiff::{Timestamp, civil::Date, tz::TimeZone};
use mockall::automock;

/// Wall-clock source used by every service. Injected so tests can pin time.
#[automock]
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;

    /// Current calendar date in UTC.
    fn today(&self) -> Date {
        self.now().to_zoned(TimeZone::UTC).date()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Fixed clock for tests; advances only when told to.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: std::sync::Arc<std::sync::Mutex<Timestamp>>,
}

impl FixedClock {
    #[must_use]
    pub fn new(now: Timestamp) -> Self {
        Self {
            now: std::sync::Arc::new(std::sync::Mutex::new(now)),
        }
    }

    /// Move the clock forward by the given number of seconds.
    pub fn advance_secs(&self, secs: i64) {
        let mut now = self.now.lock().unwrap();
        *now = now.checked_add(jiff::Span::new().seconds(secs)).unwrap();
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().unwrap()
    }
}
