//! Run loop driving cursor-then-compute cycles
//!
//! One cycle = ask the cursor for the next primary window, hand it to the
//! aggregator. Cycles run strictly one after another. Shutdown is only
//! observed between cycles, never inside a transaction.

use super::aggregator::CascadingAggregator;
use super::context::StatContext;
use super::cursor::RangeCursor;
use super::error::StatError;
use super::types::TimeRange;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Duration;

pub struct StatRunner {
    ctx: Arc<StatContext>,
    cursor: RangeCursor,
    aggregator: CascadingAggregator,
    poll_interval: Duration,
}

impl StatRunner {
    pub fn new(ctx: Arc<StatContext>, poll_interval: Duration) -> Self {
        Self {
            cursor: RangeCursor::new(ctx.clone()),
            aggregator: CascadingAggregator::new(ctx.clone()),
            ctx,
            poll_interval,
        }
    }

    /// Process the next primary window, if one is available
    pub async fn run_cycle(&self) -> Result<Option<TimeRange>, StatError> {
        let range = match self.cursor.next_range(self.ctx.primary_interval).await? {
            Some(range) => range,
            None => return Ok(None),
        };

        self.aggregator.compute(&range)?;
        Ok(Some(range))
    }

    /// Run cycles until no window is available or `shutdown` is raised
    ///
    /// Returns how many windows were processed. Stops at the first error.
    pub async fn catch_up(&self, shutdown: &watch::Receiver<bool>) -> Result<usize, StatError> {
        let mut processed = 0;
        while !*shutdown.borrow() {
            match self.run_cycle().await? {
                Some(range) => {
                    processed += 1;
                    log::info!("📊 Address stat computed for {}", range);
                }
                None => break,
            }
        }
        Ok(processed)
    }

    /// Poll forever: catch up, then sleep `poll_interval`, until shutdown
    ///
    /// Failed cycles are logged and retried on the next tick. Retrying is safe
    /// because a failed cycle leaves nothing behind.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        log::info!(
            "⏰ Starting address stat runner (interval: {}, poll: {}ms)",
            self.ctx.primary_interval,
            self.poll_interval.as_millis()
        );

        loop {
            match self.catch_up(&shutdown).await {
                Ok(0) => {}
                Ok(n) => log::debug!("✅ Caught up {} windows", n),
                Err(e) => log::error!("❌ Address stat cycle failed: {}", e),
            }

            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                changed = shutdown.changed() => {
                    // Sender dropped counts as shutdown
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        log::info!("✅ Address stat runner stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stat::error::StoreError;
    use crate::stat::test_support::{day, Faults, TestEnv};
    use crate::stat::types::StatType;
    use chrono::Duration as ChronoDuration;

    #[tokio::test]
    async fn test_catch_up_processes_all_elapsed_windows() {
        let env = TestEnv::new(StatType::Day, day(0), day(4) + ChronoDuration::hours(5));
        env.add_addresses(3, day(1));

        let runner = StatRunner::new(env.ctx.clone(), Duration::from_millis(10));
        let (_tx, rx) = watch::channel(false);

        assert_eq!(runner.catch_up(&rx).await.unwrap(), 4);
        assert_eq!(runner.catch_up(&rx).await.unwrap(), 0);

        let last = env.stat(StatType::Day, day(3)).unwrap();
        assert_eq!(last.total, 3);

        env.clock.set(day(5));
        assert_eq!(runner.catch_up(&rx).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_catch_up_honours_shutdown() {
        let env = TestEnv::new(StatType::Day, day(0), day(10));
        let runner = StatRunner::new(env.ctx.clone(), Duration::from_millis(10));
        let (_tx, rx) = watch::channel(true);

        assert_eq!(runner.catch_up(&rx).await.unwrap(), 0);
        assert!(env.stat(StatType::Day, day(0)).is_none());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_signal() {
        let env = TestEnv::new(StatType::Day, day(0), day(2));
        let runner = Arc::new(StatRunner::new(env.ctx.clone(), Duration::from_secs(60)));
        let (tx, rx) = watch::channel(false);

        let handle = {
            let runner = runner.clone();
            tokio::spawn(async move { runner.run(rx).await })
        };

        // Wait for the first catch-up to land, then stop the loop mid-sleep
        for _ in 0..100 {
            if env.stat(StatType::Day, day(1)).is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("runner did not stop")
            .unwrap();

        assert!(env.stat(StatType::Day, day(0)).is_some());
        assert!(env.stat(StatType::Day, day(1)).is_some());
    }

    #[tokio::test]
    async fn test_cycle_stops_on_unavailable_store() {
        let env = TestEnv::with_faults(
            StatType::Day,
            day(0),
            day(3),
            Faults {
                last_by_type: true,
                ..Faults::default()
            },
        );
        env.add_addresses(2, day(0));
        let runner = StatRunner::new(env.ctx.clone(), Duration::from_millis(10));
        let (_tx, rx) = watch::channel(false);

        let err = runner.catch_up(&rx).await.unwrap_err();
        assert!(matches!(err, StatError::Store(StoreError::Io(_))));
        assert!(env.all_stats().is_empty());
    }
}
