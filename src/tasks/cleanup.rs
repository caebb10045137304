use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::metrics::RateLimitMetrics;
use crate::ratelimit::RateLimiter;

/// Background task that sweeps expired rate limit histories
pub struct HistoryCleanupTask {
    interval: Duration,
    rate_limiter: Arc<RateLimiter>,
    shutdown: broadcast::Receiver<()>,
}

impl HistoryCleanupTask {
    pub fn new(
        interval: Duration,
        rate_limiter: Arc<RateLimiter>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            interval,
            rate_limiter,
            shutdown,
        }
    }

    /// Run until a shutdown signal arrives
    pub async fn run(mut self) {
        let mut cleanup_timer = tokio::time::interval(self.interval.max(Duration::from_millis(1)));

        // Skip immediate first tick
        cleanup_timer.tick().await;

        tracing::info!(
            cleanup_interval_ms = self.interval.as_millis() as u64,
            backend = self.rate_limiter.backend_type().as_str(),
            "History cleanup task started"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("History cleanup task received shutdown signal");
                    break;
                }
                _ = cleanup_timer.tick() => {
                    self.sweep().await;
                }
            }
        }

        tracing::info!("History cleanup task stopped");
    }

    async fn sweep(&self) {
        match self.rate_limiter.cleanup_expired().await {
            Ok(removed) => {
                if removed > 0 {
                    tracing::debug!(removed = removed, "Swept expired rate limit histories");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Rate limit history sweep failed");
            }
        }

        if let Some(count) = self.rate_limiter.stats().await.tracked_keys {
            RateLimitMetrics::set_tracked_keys(count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::{
        HistoryStore, ManualClock, MemoryHistoryStore, PolicyTable, RateLimitRequest,
        ACTION_CREATE_SCENARIO,
    };

    #[tokio::test]
    async fn test_sweeps_until_shutdown() {
        let clock = Arc::new(ManualClock::new(0));
        let store = Arc::new(MemoryHistoryStore::with_clock(clock.clone()));
        let limiter = Arc::new(RateLimiter::new(
            PolicyTable::standard(),
            store.clone(),
            clock.clone(),
        ));

        limiter
            .check_rate_limit(&RateLimitRequest::new("u1", ACTION_CREATE_SCENARIO))
            .await
            .unwrap();
        assert_eq!(store.tracked_keys().await.unwrap(), Some(1));

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = HistoryCleanupTask::new(Duration::from_millis(20), limiter, shutdown_rx);
        let handle = tokio::spawn(task.run());

        // History outlives the hour-long window, then the next tick sweeps it
        clock.advance(Duration::from_secs(3601));
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(store.tracked_keys().await.unwrap(), Some(0));

        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
