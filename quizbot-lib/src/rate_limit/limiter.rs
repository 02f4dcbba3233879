//! Sliding window rate limiter for outgoing messages.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Sliding window rate limiter.
///
/// Tracks send timestamps and enforces a maximum number of messages within a
/// sliding time window. The default of 30 messages per second matches the
/// Bot API broadcast limit, which matters when a game start or a new question
/// is pushed to every player at once.
///
/// Cheap to clone; clones share the same window.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use quizbot_lib::rate_limit::RateLimiter;
///
/// let limiter = RateLimiter::default();
/// assert_eq!(limiter.capacity(), 30);
///
/// let per_chat = RateLimiter::new(20, Duration::from_secs(60));
/// assert_eq!(per_chat.window(), Duration::from_secs(60));
/// ```
#[derive(Clone, Debug)]
pub struct RateLimiter {
    inner: Arc<RateLimiterInner>,
}

#[derive(Debug)]
struct RateLimiterInner {
    state: Mutex<RateLimiterState>,
    capacity: u32,
    window: Duration,
}

#[derive(Debug)]
struct RateLimiterState {
    /// Timestamps of recent sends within the window.
    timestamps: VecDeque<Instant>,
}

impl RateLimiterState {
    fn evict(&mut self, now: Instant, window: Duration) {
        let Some(cutoff) = now.checked_sub(window) else {
            return;
        };
        while let Some(&ts) = self.timestamps.front() {
            if ts < cutoff {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }
}

impl RateLimiter {
    /// Creates a new rate limiter.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum sends allowed within the window
    /// * `window` - Duration of the sliding window
    pub fn new(capacity: u32, window: Duration) -> Self {
        Self {
            inner: Arc::new(RateLimiterInner {
                state: Mutex::new(RateLimiterState {
                    timestamps: VecDeque::with_capacity(capacity as usize),
                }),
                capacity,
                window,
            }),
        }
    }

    /// Waits until a send slot is free and claims it.
    pub async fn acquire(&self) {
        loop {
            let wait_time = {
                let mut state = self.inner.state.lock().await;
                let now = Instant::now();
                state.evict(now, self.inner.window);

                if (state.timestamps.len() as u32) < self.inner.capacity {
                    state.timestamps.push_back(now);
                    return;
                }

                state
                    .timestamps
                    .front()
                    .map(|&oldest| oldest + self.inner.window)
                    .filter(|&expires_at| expires_at > now)
                    .map(|expires_at| expires_at - now)
            };

            // Sleep outside the lock
            if let Some(wait) = wait_time {
                tokio::time::sleep(wait).await;
            }
        }
    }

    /// Returns the number of sends that can happen immediately.
    pub async fn available(&self) -> u32 {
        let mut state = self.inner.state.lock().await;
        state.evict(Instant::now(), self.inner.window);
        self.inner
            .capacity
            .saturating_sub(state.timestamps.len() as u32)
    }

    /// Returns the configured capacity.
    pub fn capacity(&self) -> u32 {
        self.inner.capacity
    }

    /// Returns the configured window duration.
    pub fn window(&self) -> Duration {
        self.inner.window
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(30, Duration::from_secs(1))
    }
}
