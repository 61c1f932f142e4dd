use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, interval};
use tracing::{debug, info};

use super::connections::ConnectionGate;
use super::window::RateLimiter;
use crate::metrics::{TRACKED_CONNECTION_SETS, TRACKED_WINDOWS};

// Background eviction loop - keeps both stores from growing without
// bound. The request path never deletes records; this is the only thing
// that does.
pub fn spawn_sweeper(
    limiter: Arc<RateLimiter>,
    gate: Arc<ConnectionGate>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_secs = every.as_secs(), "sweeper started");
        let mut ticker = interval(every);
        // first tick fires immediately, nothing to sweep yet
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let expired = limiter.evict_expired();
            let empty = gate.evict_empty();
            TRACKED_WINDOWS.set(limiter.tracked() as f64);
            TRACKED_CONNECTION_SETS.set(gate.tracked() as f64);
            if expired > 0 || empty > 0 {
                debug!(expired, empty, "swept limiter stores");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn sweeps_both_stores_on_the_interval() {
        let limiter = Arc::new(RateLimiter::new());
        let gate = Arc::new(ConnectionGate::new(60));

        // a 1ms window, with real time allowed to pass so it is expired
        // on the wall clock the eviction check reads
        limiter.admit("stale", 5, 1);
        std::thread::sleep(Duration::from_millis(10));
        gate.acquire("gone", "conn", 5);
        gate.release("gone", "conn");

        let handle = spawn_sweeper(limiter.clone(), gate.clone(), Duration::from_secs(300));
        tokio::time::sleep(Duration::from_secs(301)).await;

        // after one tick both stores are empty again
        assert_eq!(limiter.tracked(), 0);
        assert_eq!(gate.tracked(), 0);

        // and a fresh admit behaves as if no history existed
        let slot = limiter.admit("stale", 5, 60_000);
        assert_eq!(slot.remaining, 4);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn leaves_live_records_alone() {
        let limiter = Arc::new(RateLimiter::new());
        let gate = Arc::new(ConnectionGate::new(60));

        limiter.admit("live", 5, 3_600_000);
        gate.acquire("streaming", "conn", 5);

        let handle = spawn_sweeper(limiter.clone(), gate.clone(), Duration::from_secs(300));
        tokio::time::sleep(Duration::from_secs(301)).await;

        assert_eq!(limiter.tracked(), 1);
        let slot = limiter.admit("live", 5, 3_600_000);
        assert_eq!(slot.remaining, 3);
        assert_eq!(gate.active("streaming"), 1);

        handle.abort();
    }
}
