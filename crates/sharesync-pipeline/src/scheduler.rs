// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delayed, repeating execution of background operations.

use std::sync::Arc;
use std::time::Duration;

use sharesync_core::{BackgroundOperation, SyncError};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Runs operations after a start delay and then at a fixed interval until cancelled.
///
/// A cycle that overruns the interval delays the next tick instead of
/// queueing a burst.
#[derive(Debug, Clone)]
pub struct PeriodicScheduler {
    delay: Duration,
    interval: Duration,
    cancel: CancellationToken,
}

impl PeriodicScheduler {
    pub fn new(delay: Duration, interval: Duration, cancel: CancellationToken) -> Self {
        Self {
            delay,
            interval,
            cancel,
        }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Stop every operation started by this scheduler.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn spawn(&self, operation: Arc<dyn BackgroundOperation>) -> JoinHandle<()> {
        let delay = self.delay;
        let period = self.interval;
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            let name = operation.name().to_string();
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => {
                    debug!(operation = %name, "cancelled before first run");
                    return;
                }
            }

            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(operation = %name, interval_ms = period.as_millis() as u64, "scheduler started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match operation.run_cycle(&cancel).await {
                            Ok(()) => debug!(operation = %name, "cycle complete"),
                            Err(SyncError::Cancelled) => break,
                            Err(e) => warn!(operation = %name, error = %e, "cycle failed"),
                        }
                    }
                    _ = cancel.cancelled() => break,
                }
            }
            info!(operation = %name, "scheduler stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing_test::traced_test;

    #[derive(Default)]
    struct Counter {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl BackgroundOperation for Counter {
        fn name(&self) -> &str {
            "counter"
        }

        async fn run_cycle(&self, _cancel: &CancellationToken) -> Result<(), SyncError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_delay_then_repeats() {
        let counter = Arc::new(Counter::default());
        let scheduler = PeriodicScheduler::new(
            Duration::from_secs(1),
            Duration::from_secs(5),
            CancellationToken::new(),
        );
        let handle = scheduler.spawn(counter.clone());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(counter.runs.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(counter.runs.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(counter.runs.load(Ordering::SeqCst), 2);

        scheduler.stop();
        handle.await.unwrap();
    }

    struct Failing {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl BackgroundOperation for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn run_cycle(&self, _cancel: &CancellationToken) -> Result<(), SyncError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Err(SyncError::remote("unreachable"))
        }
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn failed_cycle_is_logged_and_retried() {
        let failing = Arc::new(Failing {
            runs: AtomicUsize::new(0),
        });
        let scheduler = PeriodicScheduler::new(
            Duration::ZERO,
            Duration::from_secs(1),
            CancellationToken::new(),
        );
        let handle = scheduler.spawn(failing.clone());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        scheduler.stop();
        handle.await.unwrap();

        assert_eq!(failing.runs.load(Ordering::SeqCst), 2);
        assert!(logs_contain("cycle failed"));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_before_delay_skips_all_runs() {
        let counter = Arc::new(Counter::default());
        let scheduler = PeriodicScheduler::new(
            Duration::from_secs(10),
            Duration::from_secs(1),
            CancellationToken::new(),
        );
        let handle = scheduler.spawn(counter.clone());
        scheduler.stop();
        handle.await.unwrap();
        assert_eq!(counter.runs.load(Ordering::SeqCst), 0);
    }
}
