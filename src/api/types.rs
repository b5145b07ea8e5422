//! Shared types for the API layer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::core_state::CoreState;

/// Failed logins allowed before a username is locked.
const LOCKOUT_THRESHOLD: u32 = 5;
/// How long a locked username stays locked.
const LOCKOUT_DURATION: Duration = Duration::from_secs(300);
/// Tracked keys above which stale entries are swept on the next write.
const SWEEP_THRESHOLD: usize = 1024;

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);

// ═══════════════════════════════════════════════════════════
// API context — shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes and middleware.
/// Wraps `CoreState` plus API-specific caches.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
    pub rate_limiter: Arc<Mutex<RateLimiter>>,
    pub lockout: Arc<Mutex<LoginLockout>>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self {
            core,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new())),
            lockout: Arc::new(Mutex::new(LoginLockout::new())),
        }
    }
}

/// Raw session token, injected next to the `StaffSession` by the auth
/// middleware so logout can close it.
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

// ═══════════════════════════════════════════════════════════
// Rate limiter — per-client sliding window
// ═══════════════════════════════════════════════════════════

/// Per-client rate limiter with per-minute and per-hour limits.
pub struct RateLimiter {
    windows: HashMap<String, Vec<Instant>>,
    per_minute: u32,
    per_hour: u32,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_limits(100, 1000)
    }

    pub fn with_limits(per_minute: u32, per_hour: u32) -> Self {
        Self {
            windows: HashMap::new(),
            per_minute,
            per_hour,
        }
    }

    /// Check if a client is within rate limits. Returns `Ok(())` or
    /// `Err(retry_after_secs)` if exceeded.
    pub fn check(&mut self, client: &str) -> Result<(), u64> {
        let now = Instant::now();
        if self.windows.len() >= SWEEP_THRESHOLD {
            self.sweep(now);
        }

        let entries = self.windows.entry(client.to_string()).or_default();

        // Clean entries older than 1 hour
        entries.retain(|ts| now.duration_since(*ts) < HOUR);

        let last_minute = entries
            .iter()
            .filter(|ts| now.duration_since(**ts) < MINUTE)
            .count() as u32;
        if last_minute >= self.per_minute {
            return Err(60);
        }

        if entries.len() as u32 >= self.per_hour {
            return Err(3600);
        }

        entries.push(now);
        Ok(())
    }

    /// Number of clients with a live window.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    /// Drop clients with no request in the last hour.
    fn sweep(&mut self, now: Instant) {
        self.windows
            .retain(|_, entries| entries.iter().any(|ts| now.duration_since(*ts) < HOUR));
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════
// Login lockout — brute-force protection per username
// ═══════════════════════════════════════════════════════════

struct FailureRecord {
    count: u32,
    last_failure: Instant,
    locked_until: Option<Instant>,
}

impl FailureRecord {
    /// Unlocked counts are forgotten `duration` after the last failure.
    fn is_stale(&self, now: Instant, duration: Duration) -> bool {
        match self.locked_until {
            Some(until) => until <= now,
            None => now.duration_since(self.last_failure) >= duration,
        }
    }
}

/// Counts consecutive failed logins per username.
pub struct LoginLockout {
    failures: HashMap<String, FailureRecord>,
    threshold: u32,
    duration: Duration,
}

impl LoginLockout {
    pub fn new() -> Self {
        Self {
            failures: HashMap::new(),
            threshold: LOCKOUT_THRESHOLD,
            duration: LOCKOUT_DURATION,
        }
    }

    /// `Err(retry_after_secs)` while the username is locked.
    pub fn check(&mut self, username: &str) -> Result<(), u64> {
        let now = Instant::now();
        let Some(record) = self.failures.get(username) else {
            return Ok(());
        };
        if let Some(until) = record.locked_until.filter(|until| *until > now) {
            return Err(until.duration_since(now).as_secs().max(1));
        }
        if record.is_stale(now, self.duration) {
            self.failures.remove(username);
        }
        Ok(())
    }

    /// Record a failed attempt. Returns `true` when this failure locks the username.
    pub fn record_failure(&mut self, username: &str) -> bool {
        let now = Instant::now();
        if self.failures.len() >= SWEEP_THRESHOLD {
            self.sweep(now);
        }

        let duration = self.duration;
        let record = self
            .failures
            .entry(username.to_string())
            .or_insert(FailureRecord {
                count: 0,
                last_failure: now,
                locked_until: None,
            });
        if record.is_stale(now, duration) {
            record.count = 0;
            record.locked_until = None;
        }
        record.count += 1;
        record.last_failure = now;
        if record.count >= self.threshold && record.locked_until.is_none() {
            record.locked_until = Some(now + duration);
            tracing::warn!(username, attempts = record.count, "Username locked after failed logins");
            return true;
        }
        false
    }

    /// Number of usernames with a live failure record.
    pub fn tracked_usernames(&self) -> usize {
        self.failures.len()
    }

    fn sweep(&mut self, now: Instant) {
        let duration = self.duration;
        self.failures.retain(|_, record| !record.is_stale(now, duration));
    }

    pub fn record_success(&mut self, username: &str) {
        self.failures.remove(username);
    }
}

impl Default for LoginLockout {
    fn default() -> Self {
        Self::new()
    }
}
