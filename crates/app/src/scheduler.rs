//! Background sync loop: a periodic, jittered `sync_data` round trip.
//!
//! The store's own rate limit makes overlapping triggers harmless, so the
//! loop stays a plain sleep-and-fire task.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, info};
use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use cuetprep_cloud_sync::SharedDataService;
use cuetprep_core::scheduler::{SHARED_SYNC_INTERVAL_SECS, SHARED_SYNC_JITTER_SECS};

#[derive(Default)]
pub struct SyncScheduler {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl SyncScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the periodic sync task. Restarting replaces the previous task.
    pub fn start(&self, shared: Arc<SharedDataService>) {
        if !shared.is_enabled() {
            info!("[Scheduler] Cloud sync disabled, periodic sync not started");
            return;
        }

        let task = tokio::spawn(async move {
            loop {
                let jitter_ms = rand::thread_rng().gen_range(0..=SHARED_SYNC_JITTER_SECS * 1000);
                sleep(Duration::from_secs(SHARED_SYNC_INTERVAL_SECS)).await;
                sleep(Duration::from_millis(jitter_ms)).await;

                debug!("[Scheduler] Periodic shared-data sync");
                if !shared.sync_data().await {
                    debug!("[Scheduler] Periodic sync failed, retrying next interval");
                }
            }
        });

        let mut handle = self
            .handle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(previous) = handle.replace(task) {
            previous.abort();
        }
    }

    /// Stop the periodic sync task, if running.
    pub fn shutdown(&self) {
        let mut handle = self
            .handle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(task) = handle.take() {
            task.abort();
            info!("[Scheduler] Periodic sync stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some()
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
