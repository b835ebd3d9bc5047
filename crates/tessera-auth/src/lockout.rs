//! Failed-login counters with exponential-backoff lockout.
//!
//! One tracker is built at startup and shared (via `Arc`) by every
//! service that authenticates or resets passwords. State is
//! process-local.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::warn;
use uuid::Uuid;

use crate::config::AuthConfig;

#[derive(Debug, Clone)]
pub struct LockoutPolicy {
    pub max_failed_attempts: u32,
    pub base_duration_secs: u64,
    pub backoff_multiplier: f64,
    pub max_duration_secs: u64,
}

impl From<&AuthConfig> for LockoutPolicy {
    fn from(config: &AuthConfig) -> Self {
        Self {
            max_failed_attempts: config.max_failed_login_attempts,
            base_duration_secs: config.lockout_duration_secs,
            backoff_multiplier: config.lockout_backoff_multiplier,
            max_duration_secs: config.max_lockout_duration_secs,
        }
    }
}

impl LockoutPolicy {
    /// Lockout length for the `n`th lockout (1-based), capped at the
    /// maximum.
    fn duration_for(&self, lockouts: u32) -> Duration {
        let exponent = lockouts.saturating_sub(1) as i32;
        let secs = self.base_duration_secs as f64 * self.backoff_multiplier.powi(exponent);
        let capped = secs.min(self.max_duration_secs as f64).max(0.0);
        Duration::seconds(capped as i64)
    }
}

#[derive(Debug)]
struct FailedAttempts {
    count: u32,
    lockouts: u32,
    last_attempt: DateTime<Utc>,
    locked_until: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct LoginAttemptTracker {
    policy: LockoutPolicy,
    attempts: DashMap<String, FailedAttempts>,
}

impl LoginAttemptTracker {
    pub fn new(policy: LockoutPolicy) -> Self {
        Self {
            policy,
            attempts: DashMap::new(),
        }
    }

    /// Tracker key for an identifier within a tenant. Identifiers are
    /// compared case-insensitively.
    pub fn key(tenant_id: Uuid, identifier: &str) -> String {
        format!("{tenant_id}:{}", identifier.trim().to_lowercase())
    }

    pub fn is_locked(&self, key: &str) -> bool {
        self.is_locked_at(key, Utc::now())
    }

    pub fn is_locked_at(&self, key: &str, now: DateTime<Utc>) -> bool {
        self.attempts
            .get(key)
            .and_then(|a| a.locked_until)
            .is_some_and(|until| now < until)
    }

    /// Count one failure. Returns the lockout expiry when this failure
    /// triggered a lockout.
    pub fn record_failure(&self, key: &str) -> Option<DateTime<Utc>> {
        self.record_failure_at(key, Utc::now())
    }

    pub fn record_failure_at(&self, key: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut attempts = self
            .attempts
            .entry(key.to_string())
            .or_insert_with(|| FailedAttempts {
                count: 0,
                lockouts: 0,
                last_attempt: now,
                locked_until: None,
            });

        attempts.count += 1;
        attempts.last_attempt = now;

        if attempts.count < self.policy.max_failed_attempts {
            return None;
        }

        attempts.count = 0;
        attempts.lockouts += 1;
        let until = now + self.policy.duration_for(attempts.lockouts);
        attempts.locked_until = Some(until);
        warn!(
            key,
            lockouts = attempts.lockouts,
            locked_until = %until,
            "Login locked out after repeated failures"
        );
        Some(until)
    }

    /// Forget all failures for `key`.
    pub fn reset(&self, key: &str) {
        self.attempts.remove(key);
    }

    /// Drop entries idle for longer than `idle` whose lockout has
    /// passed.
    pub fn cleanup(&self, idle: Duration) {
        let now = Utc::now();
        let cutoff = now - idle;
        self.attempts.retain(|_, a| {
            a.last_attempt > cutoff || a.locked_until.is_some_and(|until| until > now)
        });
    }
}
