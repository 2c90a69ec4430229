//! Garbage collection of unused entries
//!
//! An entry is dropped once it has not been read for its gc time, has no
//! subscribers and has no request in flight.

use std::time::Duration;

use query_key::QueryKey;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::manager::CacheManager;

impl CacheManager {
    /// Run one collection pass. Returns the evicted keys.
    pub fn collect_garbage(&self) -> Vec<QueryKey> {
        let busy = self.busy_keys();
        let collected = self.store().collect_garbage(|key| busy.contains(key));
        self.forget_keys(&collected);

        if !collected.is_empty() {
            self.stats().record_evictions(collected.len() as u64);
            debug_log!("Garbage collected {} entries", collected.len());
        }
        collected
    }
}

/// Background task running `collect_garbage` on a fixed interval
pub struct GarbageCollector {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl GarbageCollector {
    /// Spawn the collector on the current tokio runtime
    pub fn start(manager: CacheManager, interval: Duration) -> Self {
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        manager.collect_garbage();
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("Garbage collector stopped");
        });

        tracing::debug!("Garbage collector started with interval {:?}", interval);
        Self { shutdown, handle }
    }

    /// Stop the collector and wait for the task to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.handle.await {
            tracing::warn!("Garbage collector task ended abnormally: {}", err);
        }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}
