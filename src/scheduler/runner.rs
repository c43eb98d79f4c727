//! Background task ticking the schedule table.

use super::{Scheduler, Trigger};
use mockable::Clock;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Handle to a running scheduler task.
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stops the ticker and waits for the task to exit.
    pub async fn shutdown(self) {
        if self.shutdown.send(true).is_err() {
            debug!("scheduler task already stopped");
        }
        if let Err(err) = self.task.await {
            warn!(error = %err, "scheduler task ended abnormally");
        }
    }
}

/// Spawns a task that ticks `scheduler` every `period` and sends due
/// triggers to `triggers`.
///
/// The task stops when [`SchedulerHandle::shutdown`] is called or the
/// receiving side of `triggers` is dropped.
pub fn spawn_scheduler<C>(
    scheduler: Arc<Mutex<Scheduler>>,
    clock: Arc<C>,
    period: Duration,
    triggers: mpsc::Sender<Trigger>,
) -> SchedulerHandle
where
    C: Clock + Send + Sync + 'static,
{
    let (shutdown, mut stop) = watch::channel(false);
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(period = ?period, "scheduler started");

        loop {
            tokio::select! {
                _ = stop.changed() => break,
                _ = ticker.tick() => {
                    let due = scheduler
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .tick(clock.utc());
                    for trigger in due {
                        if triggers.send(trigger).await.is_err() {
                            debug!("trigger receiver dropped; stopping scheduler");
                            return;
                        }
                    }
                }
            }
        }
        info!("scheduler stopped");
    });
    SchedulerHandle { shutdown, task }
}
