//! Sliding-window rate limiting and the login lockout latch.
//!
//! Counters live in process memory, independent of the main store, and are
//! mutated under short critical sections. Expired entries are pruned on
//! every touch of a key, plus a full sweep every `CLEANUP_INTERVAL`
//! recorded calls so abandoned keys cannot accumulate without bound.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
};

use jiff::Timestamp;

use crate::clock::Clock;

/// Full sweep of stale entries every N recorded calls.
const CLEANUP_INTERVAL: u64 = 1024;

/// Consecutive failed logins that trip the lockout latch.
const LOCKOUT_MAX_FAILURES: usize = 5;

/// Window over which consecutive failures are counted, and the latch
/// duration once tripped. Both fifteen minutes.
const LOCKOUT_WINDOW_SECS: i64 = 15 * 60;

/// Endpoint classes with independent budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateCategory {
    Login,
    PasswordResetRequest,
    PasswordResetConfirm,
    Refresh,
    VacationWrite,
    VacationRead,
    Export,
    ApiDefault,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub max_requests: u32,
    pub window_secs: i64,
}

/// Per-category limits; `Default` carries the product policy table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateTable {
    pub login: RateLimit,
    pub password_reset_request: RateLimit,
    pub password_reset_confirm: RateLimit,
    pub refresh: RateLimit,
    pub vacation_write: RateLimit,
    pub vacation_read: RateLimit,
    pub export: RateLimit,
    pub api_default: RateLimit,
}

impl Default for RateTable {
    fn default() -> Self {
        Self {
            login: RateLimit { max_requests: 5, window_secs: 60 },
            password_reset_request: RateLimit { max_requests: 3, window_secs: 3600 },
            password_reset_confirm: RateLimit { max_requests: 10, window_secs: 3600 },
            refresh: RateLimit { max_requests: 30, window_secs: 60 },
            vacation_write: RateLimit { max_requests: 60, window_secs: 3600 },
            vacation_read: RateLimit { max_requests: 200, window_secs: 3600 },
            export: RateLimit { max_requests: 10, window_secs: 86400 },
            api_default: RateLimit { max_requests: 1000, window_secs: 3600 },
        }
    }
}

impl RateTable {
    #[must_use]
    pub const fn limit(&self, category: RateCategory) -> RateLimit {
        match category {
            RateCategory::Login => self.login,
            RateCategory::PasswordResetRequest => self.password_reset_request,
            RateCategory::PasswordResetConfirm => self.password_reset_confirm,
            RateCategory::Refresh => self.refresh,
            RateCategory::VacationWrite => self.vacation_write,
            RateCategory::VacationRead => self.vacation_read,
            RateCategory::Export => self.export,
            RateCategory::ApiDefault => self.api_default,
        }
    }
}

/// Outcome of a rate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,

    /// Requests left in the current window after this one.
    pub remaining: u32,

    /// When denied, seconds until the window frees a slot.
    pub retry_after_secs: i64,
}

#[derive(Debug, Default)]
struct LockoutEntry {
    failures: Vec<Timestamp>,
    locked_until: Option<Timestamp>,
}

pub struct RateGate {
    clock: Arc<dyn Clock>,
    table: RateTable,
    windows: Mutex<HashMap<(RateCategory, String), Vec<Timestamp>>>,
    lockouts: Mutex<HashMap<String, LockoutEntry>>,
    calls: AtomicU64,
}

impl RateGate {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, table: RateTable) -> Self {
        Self {
            clock,
            table,
            windows: Mutex::new(HashMap::new()),
            lockouts: Mutex::new(HashMap::new()),
            calls: AtomicU64::new(0),
        }
    }

    /// Check the budget for `(category, key)` and record this call if allowed.
    ///
    /// Atomic: concurrent callers see a consistent window.
    pub fn check_and_record(&self, category: RateCategory, key: &str) -> RateDecision {
        let now = self.clock.now();
        let limit = self.table.limit(category);
        let window_start = now.as_second() - limit.window_secs;

        let mut windows = self.windows.lock().unwrap();

        if self.calls.fetch_add(1, Ordering::Relaxed) % CLEANUP_INTERVAL == 0 {
            Self::sweep(&mut windows, &self.table, now);
        }

        let entry = windows
            .entry((category, key.to_string()))
            .or_default();

        entry.retain(|t| t.as_second() > window_start);

        if entry.len() >= limit.max_requests as usize {
            let oldest = entry.first().copied().unwrap_or(now);

            return RateDecision {
                allowed: false,
                remaining: 0,
                retry_after_secs: (oldest.as_second() + limit.window_secs - now.as_second()).max(1),
            };
        }

        entry.push(now);

        RateDecision {
            allowed: true,
            remaining: limit.max_requests - entry.len() as u32,
            retry_after_secs: 0,
        }
    }

    /// Seconds left on the lockout latch for `email`, when set.
    pub fn login_locked(&self, email: &str) -> Option<i64> {
        let now = self.clock.now();
        let mut lockouts = self.lockouts.lock().unwrap();

        let entry = lockouts.get_mut(email)?;

        match entry.locked_until {
            Some(until) if until > now => Some((until.as_second() - now.as_second()).max(1)),
            Some(_expired) => {
                lockouts.remove(email);
                None
            }
            None => None,
        }
    }

    /// Record a failed credential verification. The fifth consecutive
    /// failure inside the window trips the latch.
    pub fn record_login_failure(&self, email: &str) {
        let now = self.clock.now();
        let window_start = now.as_second() - LOCKOUT_WINDOW_SECS;

        let mut lockouts = self.lockouts.lock().unwrap();
        let entry = lockouts.entry(email.to_string()).or_default();

        entry.failures.retain(|t| t.as_second() > window_start);
        entry.failures.push(now);

        if entry.failures.len() >= LOCKOUT_MAX_FAILURES {
            entry.locked_until =
                Some(now.checked_add(jiff::Span::new().seconds(LOCKOUT_WINDOW_SECS)).unwrap_or(now));
        }
    }

    /// A successful login resets the consecutive-failure count.
    pub fn record_login_success(&self, email: &str) {
        self.lockouts.lock().unwrap().remove(email);
    }

    /// Clear the latch out-of-band, after a completed password reset.
    pub fn clear_lockout(&self, email: &str) {
        self.lockouts.lock().unwrap().remove(email);
    }

    fn sweep(
        windows: &mut HashMap<(RateCategory, String), Vec<Timestamp>>,
        table: &RateTable,
        now: Timestamp,
    ) {
        windows.retain(|(category, _key), entry| {
            let window_start = now.as_second() - table.limit(*category).window_secs;
            entry.retain(|t| t.as_second() > window_start);
            !entry.is_empty()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;

    fn gate() -> (Arc<FixedClock>, RateGate) {
        let clock = Arc::new(FixedClock::new("2025-01-06T09:00:00Z".parse().unwrap()));

        (clock.clone(), RateGate::new(clock, RateTable::default()))
    }

    #[test]
    fn allows_up_to_the_limit_then_denies() {
        let (_clock, gate) = gate();

        for i in 0..5 {
            let decision = gate.check_and_record(RateCategory::Login, "1.2.3.4:a@co.example");
            assert!(decision.allowed, "call {i} should be allowed");
            assert_eq!(decision.remaining, 4 - i);
        }

        let denied = gate.check_and_record(RateCategory::Login, "1.2.3.4:a@co.example");

        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert!(denied.retry_after_secs > 0 && denied.retry_after_secs <= 60);
    }

    #[test]
    fn window_slides() {
        let (clock, gate) = gate();

        for _attempt in 0..5 {
            gate.check_and_record(RateCategory::Login, "key");
        }
        assert!(!gate.check_and_record(RateCategory::Login, "key").allowed);

        clock.advance_secs(61);

        assert!(gate.check_and_record(RateCategory::Login, "key").allowed);
    }

    #[test]
    fn keys_are_independent() {
        let (_clock, gate) = gate();

        for _attempt in 0..5 {
            gate.check_and_record(RateCategory::Login, "key-a");
        }

        assert!(!gate.check_and_record(RateCategory::Login, "key-a").allowed);
        assert!(gate.check_and_record(RateCategory::Login, "key-b").allowed);
    }

    #[test]
    fn categories_are_independent() {
        let (_clock, gate) = gate();

        for _attempt in 0..5 {
            gate.check_and_record(RateCategory::Login, "key");
        }

        assert!(!gate.check_and_record(RateCategory::Login, "key").allowed);
        assert!(gate.check_and_record(RateCategory::Refresh, "key").allowed);
    }

    #[test]
    fn fifth_failure_trips_the_latch() {
        let (_clock, gate) = gate();

        for _attempt in 0..4 {
            gate.record_login_failure("mallory@co.example");
            assert!(gate.login_locked("mallory@co.example").is_none());
        }

        gate.record_login_failure("mallory@co.example");

        let remaining = gate.login_locked("mallory@co.example").unwrap();
        assert!(remaining > 0 && remaining <= 900);
    }

    #[test]
    fn latch_expires_after_fifteen_minutes() {
        let (clock, gate) = gate();

        for _attempt in 0..5 {
            gate.record_login_failure("mallory@co.example");
        }
        assert!(gate.login_locked("mallory@co.example").is_some());

        clock.advance_secs(901);

        assert!(gate.login_locked("mallory@co.example").is_none());
    }

    #[test]
    fn success_resets_consecutive_failures() {
        let (_clock, gate) = gate();

        for _attempt in 0..4 {
            gate.record_login_failure("alice@co.example");
        }

        gate.record_login_success("alice@co.example");

        for _attempt in 0..4 {
            gate.record_login_failure("alice@co.example");
        }

        assert!(gate.login_locked("alice@co.example").is_none());
    }

    #[test]
    fn reset_clears_the_latch() {
        let (_clock, gate) = gate();

        for _attempt in 0..5 {
            gate.record_login_failure("mallory@co.example");
        }
        assert!(gate.login_locked("mallory@co.example").is_some());

        gate.clear_lockout("mallory@co.example");

        assert!(gate.login_locked("mallory@co.example").is_none());
    }

    #[test]
    fn stale_failures_fall_out_of_the_window() {
        let (clock, gate) = gate();

        for _attempt in 0..4 {
            gate.record_login_failure("slow@co.example");
        }

        clock.advance_secs(LOCKOUT_WINDOW_SECS + 1);
        gate.record_login_failure("slow@co.example");

        assert!(gate.login_locked("slow@co.example").is_none());
    }
}
