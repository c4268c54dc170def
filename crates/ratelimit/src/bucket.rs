use tokio::time::Instant;

/// A refilling token bucket for one `(identity, operation)` key.
pub(crate) struct Bucket {
    tokens: f64,
    rate_per_sec: f64,
    burst: f64,
    last_refill: Instant,
    last_seen: Instant,
}

impl Bucket {
    pub(crate) fn new(rate_per_sec: f64, burst: f64, now: Instant) -> Self {
        Self {
            tokens: burst,
            rate_per_sec,
            burst,
            last_refill: now,
            last_seen: now,
        }
    }

    /// Refills based on elapsed time, then atomically decrements if a token
    /// is available. Returns whether the call is allowed.
    pub(crate) fn try_allow(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate_per_sec).min(self.burst);
        self.last_refill = now;
        self.last_seen = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    pub(crate) fn idle_since(&self, now: Instant) -> std::time::Duration {
        now.saturating_duration_since(self.last_seen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn burst_is_exhausted_then_refills() {
        let mut bucket = Bucket::new(1.0, 3.0, Instant::now());
        assert!(bucket.try_allow(Instant::now()));
        assert!(bucket.try_allow(Instant::now()));
        assert!(bucket.try_allow(Instant::now()));
        assert!(!bucket.try_allow(Instant::now()));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(bucket.try_allow(Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn never_exceeds_burst_capacity() {
        let mut bucket = Bucket::new(100.0, 3.0, Instant::now());
        tokio::time::advance(Duration::from_secs(10)).await;
        let mut allowed = 0;
        for _ in 0..10 {
            if bucket.try_allow(Instant::now()) {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 3);
    }
}
