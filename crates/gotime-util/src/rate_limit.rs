//! API request rate limiting
//!
//! One `RateLimiter` is shared by every call path to the travel-time source.
//! It enforces two budgets at once: a sliding one-minute window and a rolling
//! daily quota. `acquire` blocks the calling task (never the runtime) until a
//! request may legally be issued, then records it atomically.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::debug;

/// Width of the sliding request window
const MINUTE_WINDOW: Duration = Duration::from_secs(60);

/// Safety margin added when waiting for the oldest window entry to age out
const WINDOW_BUFFER: Duration = Duration::from_secs(1);

/// Sleeps are sliced so shutdown is observed within one slice
const MAX_SLEEP_SLICE: Duration = Duration::from_secs(10);

/// Fixed backoff when the daily quota is exhausted; there is no way to
/// compute the exact wait, so recheck on this cadence
const DAILY_BACKOFF: Duration = Duration::from_secs(60);

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Snapshot of current rate-limiter consumption
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterUsage {
    pub minute_used: usize,
    pub minute_limit: usize,
    pub daily_used: u32,
    pub daily_limit: u32,
}

impl RateLimiterUsage {
    pub fn minute_remaining(&self) -> usize {
        self.minute_limit.saturating_sub(self.minute_used)
    }

    pub fn daily_remaining(&self) -> u32 {
        self.daily_limit.saturating_sub(self.daily_used)
    }
}

#[derive(Debug)]
struct LimiterState {
    /// Timestamps of requests issued in the trailing minute, oldest first
    window: VecDeque<Instant>,
    daily_count: u32,
    daily_reset_at: Instant,
}

impl LimiterState {
    /// Drop window entries older than a minute and roll the daily counter
    /// once its reset instant has passed. Entries arrive in increasing time
    /// order, so the window trim is a prefix trim.
    fn roll(&mut self, now: Instant) {
        while let Some(oldest) = self.window.front() {
            if now.duration_since(*oldest) >= MINUTE_WINDOW {
                self.window.pop_front();
            } else {
                break;
            }
        }

        if now >= self.daily_reset_at {
            self.daily_count = 0;
            while self.daily_reset_at <= now {
                self.daily_reset_at += DAY;
            }
        }
    }
}

/// Shared rate limiter for the external travel-time source
#[derive(Debug)]
pub struct RateLimiter {
    minute_limit: usize,
    daily_limit: u32,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    /// Create a limiter allowing `per_minute` requests in any trailing minute
    /// and `per_day` requests per rolling 24-hour period.
    pub fn new(per_minute: u32, per_day: u32) -> Self {
        // A zero budget would block every caller forever; clamp to one.
        Self {
            minute_limit: per_minute.max(1) as usize,
            daily_limit: per_day.max(1),
            state: Mutex::new(LimiterState {
                window: VecDeque::new(),
                daily_count: 0,
                daily_reset_at: Instant::now() + DAY,
            }),
        }
    }

    /// Block until a request may be issued, then record it.
    ///
    /// Never fails; a caller that must give up should wrap this in its own
    /// timeout. The internal mutex is only held for bookkeeping, never
    /// across a sleep.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().unwrap();
                let now = Instant::now();
                state.roll(now);

                if state.daily_count >= self.daily_limit {
                    Some(DAILY_BACKOFF)
                } else if state.window.len() >= self.minute_limit {
                    // Wait until the oldest entry ages past the window
                    let oldest = *state.window.front().unwrap();
                    Some((oldest + MINUTE_WINDOW + WINDOW_BUFFER).saturating_duration_since(now))
                } else {
                    state.window.push_back(now);
                    state.daily_count += 1;
                    None
                }
            };

            match wait {
                None => return,
                Some(wait) => {
                    debug!(wait_secs = wait.as_secs(), "Rate limit reached, waiting");
                    sleep(wait.min(MAX_SLEEP_SLICE)).await;
                }
            }
        }
    }

    /// Current consumption of both budgets. Does not mutate limiter state:
    /// stale window entries are excluded from the count but not removed.
    pub fn usage(&self) -> RateLimiterUsage {
        let state = self.state.lock().unwrap();
        let now = Instant::now();

        let minute_used = state
            .window
            .iter()
            .filter(|t| now.duration_since(**t) < MINUTE_WINDOW)
            .count();
        let daily_used = if now >= state.daily_reset_at {
            0
        } else {
            state.daily_count
        };

        RateLimiterUsage {
            minute_used,
            minute_limit: self.minute_limit,
            daily_used,
            daily_limit: self.daily_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn acquire_within_limits_is_immediate() {
        let limiter = RateLimiter::new(5, 100);
        let start = Instant::now();

        for _ in 0..5 {
            limiter.acquire().await;
        }

        assert_eq!(start.elapsed(), Duration::ZERO);
        let usage = limiter.usage();
        assert_eq!(usage.minute_used, 5);
        assert_eq!(usage.daily_used, 5);
        assert_eq!(usage.minute_remaining(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_over_minute_limit_is_delayed() {
        let limiter = RateLimiter::new(3, 100);
        let start = Instant::now();

        for _ in 0..3 {
            limiter.acquire().await;
        }
        // Fourth call must wait for the first to age out of the window
        limiter.acquire().await;

        let elapsed = start.elapsed();
        assert!(
            elapsed >= MINUTE_WINDOW,
            "4th acquire completed after {:?}, expected >= 60s",
            elapsed
        );
        // The +1s buffer bounds the wait above 60s but keeps it tight
        assert!(elapsed <= MINUTE_WINDOW + Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn daily_quota_blocks_until_reset() {
        let limiter = RateLimiter::new(100, 3);
        let start = Instant::now();

        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert_eq!(limiter.usage().daily_used, 3);

        // Fourth call can only proceed after the daily counter rolls over
        limiter.acquire().await;

        assert!(start.elapsed() >= DAY);
        let usage = limiter.usage();
        assert!(usage.daily_used <= usage.daily_limit);
        assert_eq!(usage.daily_used, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn window_frees_up_after_a_minute() {
        let limiter = RateLimiter::new(2, 100);
        limiter.acquire().await;
        limiter.acquire().await;
        assert_eq!(limiter.usage().minute_used, 2);

        tokio::time::advance(MINUTE_WINDOW + Duration::from_secs(1)).await;

        assert_eq!(limiter.usage().minute_used, 0);
        let start = Instant::now();
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn usage_does_not_mutate_state() {
        let limiter = RateLimiter::new(5, 100);
        limiter.acquire().await;

        let first = limiter.usage();
        let second = limiter.usage();
        assert_eq!(first, second);
    }
}
