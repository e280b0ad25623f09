//! Periodic task module
//!
//! Fixed-interval background jobs (cache sweeping, stats reporting) with an
//! explicit start/stop lifecycle.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::logger;

/// Handle to a running periodic job
pub struct PeriodicTask {
    name: &'static str,
    shutdown: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    /// Spawn `tick` every `period`, first run one `period` after start
    ///
    /// `period` must be non-zero.
    pub fn spawn<F, Fut>(name: &'static str, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let shutdown = Arc::new(Notify::new());
        let stop_signal = Arc::clone(&shutdown);

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => tick().await,
                    () = stop_signal.notified() => break,
                }
            }
        });

        Self {
            name,
            shutdown,
            handle,
        }
    }

    /// Stop the job and wait for the current tick to finish
    pub async fn stop(self) {
        // notify_one keeps a permit even if the loop is busy ticking
        self.shutdown.notify_one();
        if let Err(e) = self.handle.await {
            logger::log_warning(&format!("Periodic task '{}' ended abnormally: {e}", self.name));
        }
    }
}
