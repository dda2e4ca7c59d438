//! Request-rate ceiling shared by every registry call.

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};

/// Grants permission to issue one request.
///
/// One instance is shared by all workers, so concurrency never multiplies
/// the effective request rate.
#[async_trait]
pub trait RateLimit: Send + Sync + fmt::Debug {
    /// Waits until a request may be issued.
    async fn acquire(&self);
}

/// Token bucket with slot reservation.
///
/// Each caller reserves the next free slot under a short lock and sleeps
/// outside it, so waiting callers never serialize on the mutex. With the
/// default burst of one, requests are spaced `1 / rate` apart and no rolling
/// one-second window sees more than `rate` requests.
#[derive(Debug)]
pub struct TokenBucket {
    interval: Duration,
    burst: u32,
    next_free: Mutex<Option<Instant>>,
}

impl TokenBucket {
    /// Creates a bucket allowing `per_second` requests per second.
    ///
    /// Rates below one request per second are clamped to one.
    #[must_use]
    pub fn new(per_second: u32) -> Self {
        let per_second = per_second.max(1);
        Self {
            interval: Duration::from_secs(1) / per_second,
            burst: 1,
            next_free: Mutex::new(None),
        }
    }

    /// Allows up to `burst` back-to-back requests after an idle period.
    #[must_use]
    pub fn with_burst(mut self, burst: u32) -> Self {
        self.burst = burst.max(1);
        self
    }

    /// Spacing between consecutive requests at full load.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    async fn reserve(&self) -> Instant {
        let now = Instant::now();
        let mut next_free = self.next_free.lock().await;
        let credit = self.interval * (self.burst - 1);

        let earliest = next_free.map_or(now, |t| t.max(now));
        let slot = earliest.checked_sub(credit).map_or(now, |t| t.max(now));
        *next_free = Some(earliest + self.interval);
        slot
    }
}

#[async_trait]
impl RateLimit for TokenBucket {
    async fn acquire(&self) {
        let slot = self.reserve().await;
        if slot > Instant::now() {
            sleep_until(slot).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_sequential_spacing() {
        let bucket = TokenBucket::new(10);
        let start = Instant::now();
        for _ in 0..5 {
            bucket.acquire().await;
        }
        // First request is immediate, the rest are 100ms apart.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(400), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(410), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_the_ceiling() {
        let bucket = Arc::new(TokenBucket::new(8));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let bucket = Arc::clone(&bucket);
            handles.push(tokio::spawn(async move {
                let mut stamps = Vec::new();
                for _ in 0..6 {
                    bucket.acquire().await;
                    stamps.push(Instant::now());
                }
                stamps
            }));
        }

        let mut stamps = Vec::new();
        for handle in handles {
            stamps.extend(handle.await.unwrap());
        }
        stamps.sort();

        assert_eq!(stamps.len(), 24);
        for (i, t) in stamps.iter().enumerate() {
            let in_window = stamps[i..]
                .iter()
                .take_while(|s| s.duration_since(*t) < Duration::from_secs(1))
                .count();
            assert!(in_window <= 8, "{in_window} requests within one second");
        }
        assert!(start.elapsed() >= Duration::from_millis(125 * 23));
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_after_idle() {
        let bucket = TokenBucket::new(10).with_burst(3);
        let start = Instant::now();
        for _ in 0..3 {
            bucket.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}
