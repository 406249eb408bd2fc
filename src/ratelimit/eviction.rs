//! Background eviction of idle visitors.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::identity::VisitorId;
use super::visitor::VisitorTable;
use crate::error::Result;

/// Handle to the task that periodically removes idle visitors.
///
/// The task stops when [`EvictionTask::shutdown`] is called or when the
/// handle is dropped.
pub struct EvictionTask {
    stop: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl EvictionTask {
    /// Spawn the eviction loop on the current Tokio runtime.
    ///
    /// Every `interval` the loop removes entries idle for longer than
    /// `threshold`. The first pass runs one interval after spawning.
    pub fn spawn<K: VisitorId>(
        table: Arc<VisitorTable<K>>,
        interval: Duration,
        threshold: Duration,
    ) -> Result<Self> {
        let runtime = Handle::try_current()?;
        let (stop_tx, stop_rx) = oneshot::channel();

        info!(
            interval_secs = interval.as_secs_f64(),
            threshold_secs = threshold.as_secs_f64(),
            "Starting visitor eviction task"
        );
        let handle = runtime.spawn(run(table, interval, threshold, stop_rx));

        Ok(Self {
            stop: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Whether the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Signal the loop to stop and wait for it to exit.
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Visitor eviction task did not exit cleanly");
            }
        }
    }
}

impl Drop for EvictionTask {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

async fn run<K: VisitorId>(
    table: Arc<VisitorTable<K>>,
    interval: Duration,
    threshold: Duration,
    mut stop: oneshot::Receiver<()>,
) {
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            // Fires on an explicit stop and when the sender is dropped
            _ = &mut stop => break,
            _ = ticker.tick() => {
                let removed = table.evict_idle(Instant::now(), threshold);
                if removed > 0 {
                    debug!(removed = removed, remaining = table.len(), "Evicted idle visitors");
                }
            }
        }
    }

    info!("Visitor eviction task stopped");
}
