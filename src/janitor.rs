//! Background sweep of expired cache entries
//!
//! The janitor wakes on a fixed period and evicts every entry whose TTL has
//! elapsed, so keys that are never requested again do not pile up. It runs
//! independently of request traffic and shares only the store.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::cache::SharedStore;

/// Default time between sweeps
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(12 * 60 * 60);

/// Handle for the background sweep task
pub struct Janitor {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl Janitor {
    /// Spawns the sweep task
    ///
    /// The first sweep runs one full `period` after spawning. Dropping the
    /// handle also stops the task.
    pub fn spawn(store: SharedStore, period: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // Skip the first tick (immediate)
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let mut guard = store.lock().await;
                        let evicted = guard.sweep(Instant::now());
                        debug!(evicted, remaining = guard.len(), "cache sweep finished");
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        info!(period_secs = period.as_secs(), "cache janitor started");
        Self { shutdown_tx, task }
    }

    /// Stops the sweep task and waits for it to finish
    ///
    /// No sweep runs after this returns.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        match self.task.await {
            Ok(()) => info!("cache janitor stopped"),
            Err(e) => warn!(error = %e, "cache janitor ended abnormally"),
        }
    }
}
