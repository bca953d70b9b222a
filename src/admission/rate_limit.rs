//! Token-bucket rate limiter.
//!
//! # Design Decisions
//! - One bucket per server; each admitted connection costs one token
//! - Refill is continuous (`rate` tokens per second, capped at `burst`)
//! - A rejected caller is not queued

use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::observability::metrics::Meter;

struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_update: now,
        }
    }

    fn try_acquire(&mut self, now: Instant, capacity: f64, refill_rate: f64) -> bool {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        if now > self.last_update {
            self.last_update = now;
        }

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Caps admissions per second.
pub struct RateLimiter {
    bucket: Mutex<TokenBucket>,
    rate: f64,
    burst: f64,
    rejected: Arc<Meter>,
}

impl RateLimiter {
    /// `burst == 0` means a bucket as large as one second of traffic.
    pub fn new(requests_per_second: u32, burst: u32, rejected: Arc<Meter>) -> Self {
        let rate = f64::from(requests_per_second);
        let burst = if burst == 0 { rate } else { f64::from(burst) };
        Self {
            bucket: Mutex::new(TokenBucket::new(burst, Instant::now())),
            rate,
            burst,
            rejected,
        }
    }

    /// Take one token now.
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    /// Take one token as of `now`.
    pub fn try_acquire_at(&self, now: Instant) -> bool {
        let admitted = self
            .bucket
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .try_acquire(now, self.burst, self.rate);
        if !admitted {
            self.rejected.mark();
        }
        admitted
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.count()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("rate", &self.rate)
            .field("burst", &self.burst)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::metrics::{MeterRegistry, REQUESTS_RATE_LIMITED};
    use std::time::Duration;

    fn limiter(rate: u32, burst: u32) -> (RateLimiter, MeterRegistry) {
        let registry = MeterRegistry::new();
        let limiter = RateLimiter::new(rate, burst, registry.meter(REQUESTS_RATE_LIMITED));
        (limiter, registry)
    }

    #[test]
    fn burst_is_admitted_then_refused() {
        let (limiter, registry) = limiter(10, 3);
        let now = Instant::now();

        assert!(limiter.try_acquire_at(now));
        assert!(limiter.try_acquire_at(now));
        assert!(limiter.try_acquire_at(now));
        assert!(!limiter.try_acquire_at(now));
        assert_eq!(registry.count(REQUESTS_RATE_LIMITED), 1);
    }

    #[test]
    fn tokens_refill_over_time() {
        let (limiter, _registry) = limiter(10, 1);
        let start = Instant::now();

        assert!(limiter.try_acquire_at(start));
        assert!(!limiter.try_acquire_at(start));
        // 10/s refills one token every 100ms.
        assert!(limiter.try_acquire_at(start + Duration::from_millis(150)));
        assert!(!limiter.try_acquire_at(start + Duration::from_millis(160)));
    }

    #[test]
    fn refill_is_capped_at_burst() {
        let (limiter, _registry) = limiter(100, 2);
        let later = Instant::now() + Duration::from_secs(60);

        assert!(limiter.try_acquire_at(later));
        assert!(limiter.try_acquire_at(later));
        assert!(!limiter.try_acquire_at(later));
    }

    #[test]
    fn zero_burst_defaults_to_rate() {
        let (limiter, _registry) = limiter(5, 0);
        let now = Instant::now();
        let admitted = (0..10).filter(|_| limiter.try_acquire_at(now)).count();
        assert_eq!(admitted, 5);
    }
}
