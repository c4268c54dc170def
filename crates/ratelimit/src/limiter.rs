use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::bucket::Bucket;
use crate::operation::Operation;

/// A keyed token-bucket limiter shared across every caller that needs to
/// rate-limit by `(identity, operation)`.
///
/// Construct with [`RateLimiter::new`], then call [`RateLimiter::spawn_janitor`]
/// once to start the background sweep; the janitor holds only a [`Weak`]
/// reference, so it exits on its own once every `Arc<RateLimiter>` is
/// dropped instead of keeping the limiter alive forever.
pub struct RateLimiter {
    buckets: Mutex<HashMap<(String, Operation), Bucket>>,
    idle_horizon: Duration,
}

impl RateLimiter {
    pub fn new(idle_horizon: Duration) -> Arc<Self> {
        Arc::new(Self {
            buckets: Mutex::new(HashMap::new()),
            idle_horizon,
        })
    }

    /// Returns `true` iff the bucket for `(identity, operation)` currently
    /// has at least one token, atomically decrementing on success. Creates
    /// the bucket with its operation's default rate/burst on first use.
    ///
    /// This is the single critical section: find-or-create and decrement
    /// happen under one lock acquisition, so a racing eviction in the
    /// janitor can never observe a half-updated bucket.
    pub fn allow(&self, identity: &str, op: Operation) -> bool {
        let now = Instant::now();
        let mut buckets = self.buckets.lock();
        let bucket = buckets
            .entry((identity.to_string(), op))
            .or_insert_with(|| {
                let (rate, burst) = op.defaults();
                Bucket::new(rate, burst, now)
            });
        bucket.try_allow(now)
    }

    /// Starts the janitor task on a fixed interval. Returns the join handle
    /// so callers can await it on shutdown, though letting it drop is also
    /// fine: the task holds no strong reference keeping anything alive.
    pub fn spawn_janitor(self: &Arc<Self>, sweep_interval: Duration) -> tokio::task::JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            loop {
                ticker.tick().await;
                let Some(limiter) = weak.upgrade() else {
                    debug!("rate limiter dropped, stopping janitor");
                    break;
                };
                limiter.sweep();
            }
        })
    }

    fn sweep(&self) {
        let now = Instant::now();
        let mut buckets = self.buckets.lock();
        let before = buckets.len();
        buckets.retain(|_, bucket| bucket.idle_since(now) < self.idle_horizon);
        let swept = before - buckets.len();
        if swept > 0 {
            debug!(swept, remaining = buckets.len(), "rate limiter janitor swept idle buckets");
        }
    }

    #[cfg(test)]
    pub(crate) fn bucket_count(&self) -> usize {
        self.buckets.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_call_for_new_identity_is_always_allowed() {
        let limiter = RateLimiter::new(Duration::from_secs(180));
        assert!(limiter.allow("1.2.3.4", Operation::SessionCreate));
    }

    #[test]
    fn burst_exhausts_then_blocks() {
        let limiter = RateLimiter::new(Duration::from_secs(180));
        for _ in 0..3 {
            assert!(limiter.allow("1.2.3.4", Operation::SessionCreate));
        }
        assert!(!limiter.allow("1.2.3.4", Operation::SessionCreate));
    }

    #[test]
    fn distinct_identities_have_independent_buckets() {
        let limiter = RateLimiter::new(Duration::from_secs(180));
        for _ in 0..3 {
            assert!(limiter.allow("a", Operation::SessionCreate));
        }
        assert!(!limiter.allow("a", Operation::SessionCreate));
        assert!(limiter.allow("b", Operation::SessionCreate));
    }

    #[test]
    fn distinct_operations_for_same_identity_are_independent() {
        let limiter = RateLimiter::new(Duration::from_secs(180));
        for _ in 0..3 {
            assert!(limiter.allow("a", Operation::SessionCreate));
        }
        assert!(!limiter.allow("a", Operation::SessionCreate));
        assert!(limiter.allow("a", Operation::SessionJoin));
    }

    #[tokio::test(start_paused = true)]
    async fn across_any_60s_window_allowed_calls_stay_within_rate_times_60_plus_burst() {
        let limiter = RateLimiter::new(Duration::from_secs(180));
        let (rate, burst) = Operation::SessionJoin.defaults();
        let mut allowed = 0;
        for _ in 0..600 {
            if limiter.allow("caller", Operation::SessionJoin) {
                allowed += 1;
            }
            tokio::time::advance(Duration::from_millis(100)).await;
        }
        let bound = (rate * 60.0 + burst).ceil() as u64;
        assert!(allowed as u64 <= bound, "allowed={allowed} bound={bound}");
    }

    #[tokio::test]
    async fn janitor_evicts_idle_buckets_and_stops_when_limiter_is_dropped() {
        let limiter = RateLimiter::new(Duration::from_millis(10));
        limiter.allow("stale", Operation::SessionCreate);
        assert_eq!(limiter.bucket_count(), 1);

        let handle = limiter.spawn_janitor(Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(limiter.bucket_count(), 0);

        drop(limiter);
        // The janitor should notice the limiter is gone and exit on its own.
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("janitor task should exit promptly after the limiter is dropped")
            .unwrap();
    }
}
