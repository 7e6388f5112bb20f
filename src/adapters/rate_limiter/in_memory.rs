//! In-memory rate limiter.
//!
//! Fixed-window counter per key, kept in a HashMap. Good for a single
//! process; windows do not survive a restart. Expired windows are swept
//! from `check` at most once per window, so the map only holds keys seen
//! in roughly the last two windows.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::ports::{
    RateLimitDenied, RateLimitError, RateLimitKey, RateLimitResult, RateLimitStatus, RateLimiter,
};

/// Message returned to throttled clients.
pub const RATE_LIMIT_MESSAGE: &str = "Too many requests from this IP, please try again later.";

#[derive(Debug)]
pub struct InMemoryRateLimiter {
    /// Requests allowed per window.
    limit: u32,
    window: Duration,
    table: Arc<RwLock<WindowTable>>,
}

#[derive(Debug)]
struct WindowTable {
    windows: HashMap<String, WindowState>,
    last_sweep: Instant,
}

#[derive(Debug, Clone, Copy)]
struct WindowState {
    count: u32,
    started: Instant,
}

impl InMemoryRateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            table: Arc::new(RwLock::new(WindowTable {
                windows: HashMap::new(),
                last_sweep: Instant::now(),
            })),
        }
    }

    /// 100 requests per 15 minutes.
    pub fn with_defaults() -> Self {
        Self::new(100, Duration::from_secs(15 * 60))
    }

    fn status_for(&self, count: u32, started: Instant, now: Instant) -> RateLimitStatus {
        let left = self.window.saturating_sub(now.duration_since(started));
        RateLimitStatus {
            limit: self.limit,
            remaining: self.limit.saturating_sub(count),
            reset_at: Utc::now() + chrono::Duration::milliseconds(left.as_millis() as i64),
            window_secs: self.window.as_secs(),
        }
    }

    fn expired(&self, state: &WindowState, now: Instant) -> bool {
        now.duration_since(state.started) >= self.window
    }

    /// Drops windows that have run out.
    pub async fn purge_expired(&self) {
        let now = Instant::now();
        let mut table = self.table.write().await;
        self.sweep(&mut table, now);
    }

    fn sweep(&self, table: &mut WindowTable, now: Instant) {
        let before = table.windows.len();
        table.windows.retain(|_, state| !self.expired(state, now));
        table.last_sweep = now;

        let dropped = before - table.windows.len();
        if dropped > 0 {
            tracing::debug!(
                dropped,
                retained = table.windows.len(),
                "Swept expired rate limit windows"
            );
        }
    }

    /// Number of windows currently held.
    pub async fn tracked_keys(&self) -> usize {
        self.table.read().await.windows.len()
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check(&self, key: RateLimitKey) -> Result<RateLimitResult, RateLimitError> {
        let storage_key = key.storage_key();
        let now = Instant::now();

        let mut table = self.table.write().await;
        if now.duration_since(table.last_sweep) >= self.window {
            self.sweep(&mut table, now);
        }

        let state = table.windows.entry(storage_key).or_insert(WindowState {
            count: 0,
            started: now,
        });

        if self.expired(state, now) {
            state.count = 0;
            state.started = now;
        }

        if state.count >= self.limit {
            let left = self.window.saturating_sub(now.duration_since(state.started));
            let retry_after_secs = left.as_secs_f64().ceil() as u64;
            tracing::debug!(key = %key.identifier, scope = %key.scope, "Rate limit exceeded");
            return Ok(RateLimitResult::Denied(RateLimitDenied {
                limit: self.limit,
                retry_after_secs: retry_after_secs.max(1),
                message: RATE_LIMIT_MESSAGE.to_string(),
            }));
        }

        state.count += 1;
        Ok(RateLimitResult::Allowed(self.status_for(
            state.count,
            state.started,
            now,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_up_to_limit_then_denies() {
        let limiter = InMemoryRateLimiter::new(3, Duration::from_secs(60));
        let key = RateLimitKey::ip("10.0.0.1");

        for expected_remaining in [2, 1, 0] {
            match limiter.check(key.clone()).await.unwrap() {
                RateLimitResult::Allowed(status) => {
                    assert_eq!(status.remaining, expected_remaining)
                }
                RateLimitResult::Denied(_) => panic!("denied too early"),
            }
        }

        match limiter.check(key).await.unwrap() {
            RateLimitResult::Denied(denied) => {
                assert_eq!(denied.limit, 3);
                assert!(denied.retry_after_secs >= 1 && denied.retry_after_secs <= 60);
                assert_eq!(denied.message, RATE_LIMIT_MESSAGE);
            }
            RateLimitResult::Allowed(_) => panic!("should be denied"),
        }
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let limiter = InMemoryRateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check(RateLimitKey::ip("a")).await.unwrap().is_allowed());
        assert!(limiter.check(RateLimitKey::ip("b")).await.unwrap().is_allowed());
        assert!(limiter.check(RateLimitKey::ip("a")).await.unwrap().is_denied());
    }

    #[tokio::test(start_paused = true)]
    async fn window_resets_after_expiry() {
        let limiter = InMemoryRateLimiter::new(1, Duration::from_secs(900));
        let key = RateLimitKey::ip("10.0.0.2");

        assert!(limiter.check(key.clone()).await.unwrap().is_allowed());
        assert!(limiter.check(key.clone()).await.unwrap().is_denied());

        tokio::time::advance(Duration::from_secs(900)).await;
        assert!(limiter.check(key).await.unwrap().is_allowed());
    }

    #[tokio::test(start_paused = true)]
    async fn purge_drops_expired_windows() {
        let limiter = InMemoryRateLimiter::new(1, Duration::from_secs(10));
        limiter.check(RateLimitKey::ip("x")).await.unwrap();

        tokio::time::advance(Duration::from_secs(11)).await;
        limiter.purge_expired().await;
        assert_eq!(limiter.tracked_keys().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn check_sweeps_windows_of_departed_clients() {
        let limiter = InMemoryRateLimiter::new(100, Duration::from_secs(1));
        for i in 0..10_000 {
            let ip = format!("10.0.{}.{}", i / 256, i % 256);
            limiter.check(RateLimitKey::ip(&ip)).await.unwrap();
        }
        assert_eq!(limiter.tracked_keys().await, 10_000);

        tokio::time::advance(Duration::from_secs(60)).await;
        limiter.check(RateLimitKey::ip("192.168.0.1")).await.unwrap();

        assert_eq!(limiter.tracked_keys().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn live_windows_survive_a_sweep() {
        let limiter = InMemoryRateLimiter::new(2, Duration::from_secs(10));
        let stale = RateLimitKey::ip("10.0.0.8");
        let busy = RateLimitKey::ip("10.0.0.9");

        limiter.check(stale).await.unwrap();
        tokio::time::advance(Duration::from_secs(6)).await;
        limiter.check(busy.clone()).await.unwrap();
        tokio::time::advance(Duration::from_secs(5)).await;

        // Sweep runs here; `busy` is still inside its window.
        assert!(limiter.check(busy.clone()).await.unwrap().is_allowed());
        assert_eq!(limiter.tracked_keys().await, 1);
        assert!(limiter.check(busy).await.unwrap().is_denied());
    }
}
