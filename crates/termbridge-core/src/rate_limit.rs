//! Per-caller request admission.
//!
//! Each caller identity gets its own quota state, created on first sight, so
//! unrelated callers never contend on a shared window. Rejection reports how
//! long the caller should wait and does not consume quota.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::{Clock, DefaultClock};
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};

use crate::auth::CallerIdentity;

type KeyedLimiter = RateLimiter<CallerIdentity, DefaultKeyedStateStore<CallerIdentity>, DefaultClock>;

/// Keyed rate limiter configured as "at most `max_requests` per `window`".
#[derive(Clone)]
pub struct CallerRateLimiter {
    limiter: Arc<KeyedLimiter>,
    clock: DefaultClock,
    window: Duration,
}

impl CallerRateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        let clock = DefaultClock::default();
        let quota = quota_from_window(window, max_requests);
        Self {
            limiter: Arc::new(RateLimiter::new(
                quota,
                DefaultKeyedStateStore::default(),
                &clock,
            )),
            clock,
            window,
        }
    }

    /// Admit or reject one request for `identity`.
    ///
    /// `Err` carries the retry-after duration, always positive and never
    /// longer than the configured window.
    pub fn admit(&self, identity: &CallerIdentity) -> Result<(), Duration> {
        match self.limiter.check_key(identity) {
            Ok(_) => Ok(()),
            Err(not_until) => {
                let wait = not_until.wait_time_from(self.clock.now());
                Err(wait.clamp(Duration::from_millis(1), self.window))
            }
        }
    }

    pub const fn window(&self) -> Duration {
        self.window
    }
}

impl std::fmt::Debug for CallerRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallerRateLimiter")
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

fn quota_from_window(window: Duration, max_requests: u32) -> Quota {
    let safe_limit = max_requests.max(1);
    let burst = NonZeroU32::new(safe_limit).expect("safe limit must be non-zero");

    let seconds_per_cell = (window.as_secs_f64() / f64::from(safe_limit)).max(0.001);
    let period = Duration::from_secs_f64(seconds_per_cell);

    Quota::with_period(period)
        .expect("period is always greater than zero")
        .allow_burst(burst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ApiKeySet;

    fn identity(key: &str) -> CallerIdentity {
        ApiKeySet::new([key]).authenticate(Some(key)).unwrap()
    }

    #[test]
    fn admits_up_to_limit_then_rejects_with_bounded_retry_after() {
        let limiter = CallerRateLimiter::new(Duration::from_secs(60), 3);
        let caller = identity("caller-a");

        for _ in 0..3 {
            assert!(limiter.admit(&caller).is_ok());
        }

        let retry_after = limiter.admit(&caller).unwrap_err();
        assert!(retry_after > Duration::ZERO);
        assert!(retry_after <= Duration::from_secs(60));
    }

    #[test]
    fn rejection_does_not_consume_quota() {
        let limiter = CallerRateLimiter::new(Duration::from_secs(60), 1);
        let caller = identity("caller-b");

        assert!(limiter.admit(&caller).is_ok());
        let first = limiter.admit(&caller).unwrap_err();
        let second = limiter.admit(&caller).unwrap_err();
        // Rejected probes must not push the window further out.
        assert!(second <= first + Duration::from_millis(50));
    }

    #[test]
    fn unseen_identity_is_implicitly_admitted() {
        let limiter = CallerRateLimiter::new(Duration::from_secs(60), 1);
        assert!(limiter.admit(&identity("fresh-caller")).is_ok());
    }

    #[test]
    fn identities_have_independent_windows() {
        let limiter = CallerRateLimiter::new(Duration::from_secs(60), 1);
        let a = identity("caller-a");
        let b = identity("caller-b");

        assert!(limiter.admit(&a).is_ok());
        assert!(limiter.admit(&a).is_err());
        assert!(limiter.admit(&b).is_ok());
    }
}
