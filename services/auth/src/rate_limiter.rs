//! Login throttling against password guessing
//!
//! Failed logins are counted per username inside a sliding window. Once the
//! limit is reached the username is locked out for a fixed period; a
//! successful login clears its record.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::warn;

use crate::config::LoginThrottleConfig;

#[derive(Debug)]
struct FailureRecord {
    failures: u32,
    window_start: Instant,
    locked_until: Option<Instant>,
}

/// Per-username failed-login tracker
#[derive(Debug, Clone)]
pub struct LoginThrottle {
    max_attempts: u32,
    window: Duration,
    lockout: Duration,
    records: Arc<Mutex<HashMap<String, FailureRecord>>>,
}

impl LoginThrottle {
    pub fn new(config: &LoginThrottleConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            window: Duration::from_secs(config.window_seconds),
            lockout: Duration::from_secs(config.lockout_seconds),
            records: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// `Err(retry_after)` while the username is locked out
    pub async fn check(&self, username: &str) -> Result<(), Duration> {
        self.check_at(username, Instant::now()).await
    }

    async fn check_at(&self, username: &str, now: Instant) -> Result<(), Duration> {
        let mut records = self.records.lock().await;
        let Some(locked_until) = records.get(username).map(|record| record.locked_until) else {
            return Ok(());
        };

        match locked_until {
            Some(until) if now < until => Err(until - now),
            Some(_) => {
                records.remove(username);
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Record a failed login for `username`
    pub async fn record_failure(&self, username: &str) {
        self.record_failure_at(username, Instant::now()).await
    }

    async fn record_failure_at(&self, username: &str, now: Instant) {
        let mut records = self.records.lock().await;
        records.retain(|_, record| !self.is_stale(record, now));

        let record = records
            .entry(username.to_string())
            .or_insert(FailureRecord {
                failures: 0,
                window_start: now,
                locked_until: None,
            });

        if now.duration_since(record.window_start) >= self.window {
            record.failures = 0;
            record.window_start = now;
        }

        record.failures += 1;

        if record.failures >= self.max_attempts && record.locked_until.is_none() {
            record.locked_until = Some(now + self.lockout);
            warn!(
                "Locked out login for {} for {} seconds",
                username,
                self.lockout.as_secs()
            );
        }
    }

    /// Expired lockouts and failures outside the window count for nothing
    fn is_stale(&self, record: &FailureRecord, now: Instant) -> bool {
        match record.locked_until {
            Some(until) => now >= until,
            None => now.duration_since(record.window_start) >= self.window,
        }
    }

    /// Forget failures after a successful login
    pub async fn record_success(&self, username: &str) {
        self.records.lock().await.remove(username);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn throttle() -> LoginThrottle {
        LoginThrottle::new(&LoginThrottleConfig {
            max_attempts: 3,
            window_seconds: 60,
            lockout_seconds: 600,
        })
    }

    #[tokio::test]
    async fn test_locks_after_max_failures() {
        let throttle = throttle();
        let start = Instant::now();

        for _ in 0..2 {
            throttle.record_failure_at("ada", start).await;
            assert!(throttle.check_at("ada", start).await.is_ok());
        }

        throttle.record_failure_at("ada", start).await;
        let retry_after = throttle.check_at("ada", start).await.unwrap_err();
        assert_eq!(retry_after, Duration::from_secs(600));

        // Other usernames are unaffected
        assert!(throttle.check_at("grace", start).await.is_ok());
    }

    #[tokio::test]
    async fn test_lockout_expires() {
        let throttle = throttle();
        let start = Instant::now();

        for _ in 0..3 {
            throttle.record_failure_at("ada", start).await;
        }

        let later = start + Duration::from_secs(601);
        assert!(throttle.check_at("ada", later).await.is_ok());
    }

    #[tokio::test]
    async fn test_failures_outside_window_are_forgotten() {
        let throttle = throttle();
        let start = Instant::now();

        throttle.record_failure_at("ada", start).await;
        throttle.record_failure_at("ada", start).await;

        let later = start + Duration::from_secs(61);
        throttle.record_failure_at("ada", later).await;
        assert!(throttle.check_at("ada", later).await.is_ok());
    }

    #[tokio::test]
    async fn test_stale_records_are_evicted() {
        let throttle = throttle();
        let start = Instant::now();

        for i in 0..1000 {
            throttle.record_failure_at(&format!("user{}", i), start).await;
        }
        for _ in 0..3 {
            throttle.record_failure_at("locked", start).await;
        }

        let next_day = start + Duration::from_secs(86_400);
        throttle.record_failure_at("late", next_day).await;
        assert_eq!(throttle.records.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_active_lockout_survives_eviction() {
        let throttle = throttle();
        let start = Instant::now();

        for _ in 0..3 {
            throttle.record_failure_at("ada", start).await;
        }

        // Past the window but inside the lockout
        let later = start + Duration::from_secs(120);
        throttle.record_failure_at("grace", later).await;
        assert!(throttle.check_at("ada", later).await.is_err());
    }

    #[tokio::test]
    async fn test_success_clears_failures() {
        let throttle = throttle();
        let start = Instant::now();

        throttle.record_failure_at("ada", start).await;
        throttle.record_failure_at("ada", start).await;
        throttle.record_success("ada").await;
        throttle.record_failure_at("ada", start).await;

        assert!(throttle.check_at("ada", start).await.is_ok());
    }
}
