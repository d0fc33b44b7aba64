//! Fixed-window outbound rate limiting.
//!
//! Requests are counted in discrete windows of `window` length. When the
//! quota of the current window is used up, the caller is suspended until the
//! window ends and then counted as the first request of the next one.
//!
//! A burst straddling a window boundary can pass up to twice the quota in a
//! short span. That is inherent to fixed windows and is not guarded against.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::clock::{elapsed_since, Clock};

/// Counter state of the current window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitWindow {
    /// Requests admitted in this window.
    pub request_count: u32,
    /// When this window started.
    pub window_start: DateTime<Utc>,
}

impl RateLimitWindow {
    const fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            request_count: 0,
            window_start: now,
        }
    }
}

/// A per-client fixed-window rate limiter.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use loyverse_api::{ManualClock, RateLimiter};
///
/// # tokio_test::block_on(async {
/// let clock = Arc::new(ManualClock::new());
/// let mut limiter = RateLimiter::new(2, Duration::from_secs(60), clock.clone());
///
/// limiter.check_rate_limit().await;
/// limiter.check_rate_limit().await;
/// assert!(clock.sleeps().is_empty());
///
/// // Third call waits out the window.
/// limiter.check_rate_limit().await;
/// assert_eq!(clock.sleeps(), vec![Duration::from_secs(60)]);
/// assert_eq!(limiter.window().request_count, 1);
/// # });
/// ```
#[derive(Debug)]
pub struct RateLimiter {
    quota: u32,
    window_duration: Duration,
    window: RateLimitWindow,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Creates a limiter admitting `quota` requests per `window_duration`.
    ///
    /// A quota of zero is treated as one.
    #[must_use]
    pub fn new(quota: u32, window_duration: Duration, clock: Arc<dyn Clock>) -> Self {
        let window = RateLimitWindow::starting_at(clock.now());
        Self {
            quota: quota.max(1),
            window_duration,
            window,
            clock,
        }
    }

    /// Admits one request, suspending the caller if the quota is used up.
    ///
    /// Returns how long the caller was suspended (zero when admitted
    /// immediately).
    pub async fn check_rate_limit(&mut self) -> Duration {
        let now = self.clock.now();
        self.reset_if_expired(now);

        let mut waited = Duration::ZERO;
        if self.window.request_count >= self.quota {
            waited = self
                .window_duration
                .saturating_sub(elapsed_since(now, self.window.window_start));
            tracing::debug!(
                quota = self.quota,
                wait_ms = u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
                "Rate limit reached, waiting for window reset"
            );
            self.clock.sleep(waited).await;
            self.window = RateLimitWindow::starting_at(self.clock.now());
        }

        self.window.request_count += 1;
        waited
    }

    /// Returns how many requests the current window still admits without
    /// waiting.
    #[must_use]
    pub fn remaining(&self) -> u32 {
        if elapsed_since(self.clock.now(), self.window.window_start) >= self.window_duration {
            return self.quota;
        }
        self.quota.saturating_sub(self.window.request_count)
    }

    /// Returns the current window state.
    #[must_use]
    pub const fn window(&self) -> RateLimitWindow {
        self.window
    }

    /// Returns the configured quota.
    #[must_use]
    pub const fn quota(&self) -> u32 {
        self.quota
    }

    fn reset_if_expired(&mut self, now: DateTime<Utc>) {
        if elapsed_since(now, self.window.window_start) >= self.window_duration {
            self.window = RateLimitWindow::starting_at(now);
        }
    }
}
