//! Sliding-window action throttle.
//!
//! Callers are delayed, never rejected: `acquire` sleeps until a slot opens.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

const WINDOW: Duration = Duration::from_secs(1);

/// Admits at most `max_per_window` acquisitions in any trailing window.
#[derive(Debug)]
pub struct RateLimiter {
    max_per_window: usize,
    window: Duration,
    admitted: VecDeque<Instant>,
}

impl RateLimiter {
    /// One-second window. A ceiling of 0 is treated as 1.
    pub fn new(max_per_second: usize) -> Self {
        Self::with_window(max_per_second, WINDOW)
    }

    pub fn with_window(max_per_window: usize, window: Duration) -> Self {
        Self {
            max_per_window: max_per_window.max(1),
            window,
            admitted: VecDeque::new(),
        }
    }

    pub fn max_per_window(&self) -> usize {
        self.max_per_window
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.admitted.front() {
            if now.duration_since(oldest) >= self.window {
                self.admitted.pop_front();
            } else {
                break;
            }
        }
    }

    /// How long a caller arriving at `now` would have to wait.
    pub fn delay_until_available(&mut self, now: Instant) -> Duration {
        self.prune(now);
        if self.admitted.len() < self.max_per_window {
            return Duration::ZERO;
        }
        match self.admitted.front() {
            Some(&oldest) => (oldest + self.window).saturating_duration_since(now),
            None => Duration::ZERO,
        }
    }

    /// Wait for a slot and claim it. Returns the time spent waiting.
    pub async fn acquire(&mut self) -> Duration {
        let started = Instant::now();
        loop {
            let now = Instant::now();
            let delay = self.delay_until_available(now);
            if delay.is_zero() {
                self.admitted.push_back(now);
                let waited = now.duration_since(started);
                if !waited.is_zero() {
                    tracing::debug!(waited_ms = waited.as_millis() as u64, "Action throttled");
                }
                return waited;
            }
            tokio::time::sleep(delay).await;
        }
    }

    /// Acquisitions still inside the window as of now.
    pub fn in_window(&mut self) -> usize {
        self.prune(Instant::now());
        self.admitted.len()
    }

    pub fn reset(&mut self) {
        self.admitted.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn under_ceiling_never_waits() {
        let mut limiter = RateLimiter::new(3);
        for _ in 0..3 {
            assert_eq!(limiter.acquire().await, Duration::ZERO);
        }
        assert_eq!(limiter.in_window(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn fourth_action_waits_for_window() {
        let mut limiter = RateLimiter::new(3);
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        let waited = limiter.acquire().await;
        assert_eq!(waited, WINDOW);
        assert!(start.elapsed() >= WINDOW);
    }

    #[tokio::test(start_paused = true)]
    async fn no_trailing_window_exceeds_ceiling() {
        let mut limiter = RateLimiter::new(3);
        let mut stamps = Vec::new();
        for _ in 0..10 {
            limiter.acquire().await;
            stamps.push(Instant::now());
        }
        for (i, &t) in stamps.iter().enumerate() {
            let in_window = stamps[i..]
                .iter()
                .take_while(|&&s| s.duration_since(t) < WINDOW)
                .count();
            assert!(in_window <= 3, "window starting at {i} held {in_window}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slots_free_up_after_window() {
        let mut limiter = RateLimiter::new(2);
        limiter.acquire().await;
        limiter.acquire().await;
        tokio::time::advance(Duration::from_millis(1001)).await;
        assert_eq!(limiter.in_window(), 0);
        assert_eq!(limiter.acquire().await, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn delay_reports_remaining_time() {
        let mut limiter = RateLimiter::new(1);
        limiter.acquire().await;
        tokio::time::advance(Duration::from_millis(300)).await;
        let delay = limiter.delay_until_available(Instant::now());
        assert_eq!(delay, Duration::from_millis(700));
    }

    #[test]
    fn zero_ceiling_treated_as_one() {
        assert_eq!(RateLimiter::new(0).max_per_window(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_clears_window() {
        let mut limiter = RateLimiter::new(1);
        limiter.acquire().await;
        limiter.reset();
        assert_eq!(limiter.in_window(), 0);
        assert_eq!(limiter.acquire().await, Duration::ZERO);
    }
}
