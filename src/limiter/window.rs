use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::warn;

use super::slot::SlotResult;

// Fixed-window counter for one client identifier. A record past its
// reset_at is logically dead and gets replaced on the next admit (or
// evicted by the sweeper, whichever comes first).
#[derive(Debug, Clone)]
pub struct WindowRecord {
    pub count: u32,
    pub reset_at: i64, // epoch millis
}

/// Per-identifier fixed window request counter.
///
/// Fixed window over sliding window: O(1) time and memory per identifier,
/// at the cost of letting up to 2x the limit through across a window
/// boundary. The DashMap entry guard makes each admit a single critical
/// section per identifier, so concurrent admits can never both take the
/// last slot.
pub struct RateLimiter {
    records: DashMap<String, WindowRecord>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Admit or reject one request for `identifier` under a fixed window
    /// of `window_ms` with at most `limit` requests.
    pub fn admit(&self, identifier: &str, limit: u32, window_ms: i64) -> SlotResult {
        self.admit_at(identifier, limit, window_ms, Utc::now().timestamp_millis())
    }

    // Clock-injected variant so window expiry is testable without sleeping.
    fn admit_at(&self, identifier: &str, limit: u32, window_ms: i64, now: i64) -> SlotResult {
        debug_assert!(!identifier.is_empty());
        debug_assert!(limit >= 1);
        debug_assert!(window_ms >= 1);

        // The entry guard holds the shard lock for the whole
        // read-then-write, which is exactly the critical section we need.
        match self.records.entry(identifier.to_owned()) {
            Entry::Vacant(vacant) => {
                let reset_at = now + window_ms;
                vacant.insert(WindowRecord { count: 1, reset_at });
                SlotResult::granted(limit, limit - 1, reset_at)
            }
            Entry::Occupied(mut occupied) => {
                let record = occupied.get_mut();
                if now > record.reset_at {
                    // expired window: replace, don't increment
                    *record = WindowRecord {
                        count: 1,
                        reset_at: now + window_ms,
                    };
                    SlotResult::granted(limit, limit - 1, record.reset_at)
                } else if record.count >= limit {
                    let retry_after = (((record.reset_at - now) + 999) / 1000).max(1) as u64;
                    warn!(
                        identifier,
                        count = record.count,
                        limit,
                        retry_after,
                        "rate limit exceeded"
                    );
                    SlotResult::denied(limit, record.reset_at, retry_after)
                } else {
                    record.count += 1;
                    SlotResult::granted(limit, limit - record.count, record.reset_at)
                }
            }
        }
    }

    /// Drop every record whose window has already ended. Called by the
    /// sweeper; takes the same shard locks as `admit`, so it cannot race
    /// a concurrent increment on the same identifier.
    pub fn evict_expired(&self) -> usize {
        let now = Utc::now().timestamp_millis();
        // counted inside the closure: admits for fresh identifiers can
        // land mid-retain, so two len() reads would not agree
        let mut evicted = 0;
        self.records.retain(|_, record| {
            let live = now <= record.reset_at;
            if !live {
                evicted += 1;
            }
            live
        });
        evicted
    }

    /// Number of identifiers currently holding a window record.
    pub fn tracked(&self) -> usize {
        self.records.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn admits_up_to_limit_with_decreasing_remaining() {
        let limiter = RateLimiter::new();

        for expected_remaining in (0..10).rev() {
            let slot = limiter.admit("1.2.3.4", 10, 60_000);
            assert!(slot.allowed);
            assert_eq!(slot.remaining, expected_remaining);
        }
    }

    #[test]
    fn rejects_past_limit_with_bounded_retry_after() {
        let limiter = RateLimiter::new();

        // scenario: limit 10, 60s window, ten pass, eleventh does not
        for _ in 0..10 {
            assert!(limiter.admit("1.2.3.4", 10, 60_000).allowed);
        }
        let slot = limiter.admit("1.2.3.4", 10, 60_000);
        assert!(!slot.allowed);
        let retry = slot.retry_after.unwrap();
        assert!(retry > 0 && retry <= 60, "retry_after was {retry}");
    }

    #[test]
    fn window_expiry_starts_fresh_history() {
        let limiter = RateLimiter::new();
        let start = 1_000_000;

        for _ in 0..3 {
            assert!(limiter.admit_at("ip", 3, 1_000, start).allowed);
        }
        assert!(!limiter.admit_at("ip", 3, 1_000, start + 500).allowed);

        // past reset_at the record is replaced as if no history existed
        let slot = limiter.admit_at("ip", 3, 1_000, start + 1_001);
        assert!(slot.allowed);
        assert_eq!(slot.remaining, 2);
        assert_eq!(slot.reset_at, start + 2_001);
    }

    #[test]
    fn identifiers_do_not_share_windows() {
        let limiter = RateLimiter::new();
        assert!(limiter.admit("a", 1, 60_000).allowed);
        assert!(!limiter.admit("a", 1, 60_000).allowed);
        assert!(limiter.admit("b", 1, 60_000).allowed);
    }

    #[test]
    fn concurrent_admits_never_overshoot_limit() {
        let limiter = Arc::new(RateLimiter::new());
        let limit = 50u32;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                thread::spawn(move || {
                    let mut admitted = 0u32;
                    for _ in 0..25 {
                        if limiter.admit("shared", limit, 60_000).allowed {
                            admitted += 1;
                        }
                    }
                    admitted
                })
            })
            .collect();

        let total: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, limit);
    }

    #[test]
    fn evict_expired_keeps_live_records() {
        let limiter = RateLimiter::new();
        limiter.admit_at("dead", 5, 1, 0); // reset_at = 1, long gone
        limiter.admit("live", 5, 60_000);

        let evicted = limiter.evict_expired();
        assert_eq!(evicted, 1);
        assert_eq!(limiter.tracked(), 1);

        // the live record still counts against the limit
        let slot = limiter.admit("live", 5, 60_000);
        assert_eq!(slot.remaining, 3);
    }

    #[test]
    fn eviction_count_stays_sane_while_the_store_grows() {
        let limiter = Arc::new(RateLimiter::new());
        for i in 0..16 {
            limiter.admit_at(&format!("expired-{i}"), 5, 1, 0);
        }

        // admits for fresh identifiers land while eviction is running;
        // the store can end up larger than it started, and the evicted
        // count must still come out exact (the old two-len subtraction
        // underflowed here)
        let writer = {
            let limiter = limiter.clone();
            thread::spawn(move || {
                for i in 0..500 {
                    limiter.admit(&format!("fresh-{i}"), 5, 3_600_000);
                }
            })
        };
        let sweeper = {
            let limiter = limiter.clone();
            thread::spawn(move || {
                let mut total = 0usize;
                for _ in 0..100 {
                    total += limiter.evict_expired();
                }
                total
            })
        };

        writer.join().unwrap();
        let evicted = sweeper.join().unwrap();
        assert_eq!(evicted, 16);
        assert_eq!(limiter.tracked(), 500);
    }
}
