//! Background sync triggers.
//!
//! One task owns every automatic trigger: connectivity coming back, the
//! periodic tick and the delayed nudge after a local write. Each trigger
//! calls [`Synchronizer::sync_pending`], which ignores it when offline or
//! already running.

use crate::synchronizer::Synchronizer;
use std::sync::Arc;
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Spawns the trigger loop for a synchronizer.
pub struct SyncScheduler;

impl SyncScheduler {
    /// Starts the loop on the current runtime.
    ///
    /// `nudge` is notified by writers; the loop runs a pass
    /// `save_sync_delay` after the most recent notification.
    pub fn spawn(synchronizer: Arc<Synchronizer>, nudge: Arc<Notify>) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run(synchronizer, nudge, shutdown_rx));
        SchedulerHandle {
            shutdown: Some(shutdown_tx),
            task,
        }
    }
}

/// Handle to a running scheduler. Dropping it also stops the loop.
pub struct SchedulerHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stops the loop and waits for it to exit. A pass in progress is
    /// allowed to finish first.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.task).await;
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

async fn run(
    synchronizer: Arc<Synchronizer>,
    nudge: Arc<Notify>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let config = synchronizer.config().clone();
    let period = config.sync_interval();
    let save_delay = config.save_sync_delay();

    let mut connectivity = synchronizer.connectivity().subscribe();
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let pending_nudge = sleep_until(Instant::now());
    tokio::pin!(pending_nudge);
    let mut nudge_armed = false;

    info!(
        "Sync scheduler started (interval {:?}, write delay {:?})",
        period, save_delay
    );

    // An initial pass picks up anything queued by a previous session.
    if synchronizer.connectivity().is_online() {
        synchronizer.sync_pending().await;
    }

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                break;
            }
            changed = connectivity.changed() => {
                if changed.is_err() {
                    break;
                }
                let online = *connectivity.borrow_and_update();
                synchronizer.publish_status().await;
                if online {
                    debug!("Connectivity restored, syncing");
                    synchronizer.sync_pending().await;
                }
            }
            _ = ticker.tick() => {
                if synchronizer.connectivity().is_online() {
                    synchronizer.sync_pending().await;
                }
            }
            _ = nudge.notified() => {
                pending_nudge.as_mut().reset(Instant::now() + save_delay);
                nudge_armed = true;
            }
            _ = &mut pending_nudge, if nudge_armed => {
                nudge_armed = false;
                if synchronizer.connectivity().is_online() {
                    synchronizer.sync_pending().await;
                }
            }
        }
    }

    info!("Sync scheduler stopped");
}
