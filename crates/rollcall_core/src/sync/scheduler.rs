//! Fixed-interval background sync task.
//!
//! # Responsibility
//! - Run one cycle immediately, then one per configured interval.
//! - Publish the latest `SyncReport` to observers.
//! - Stop cleanly on shutdown.
//!
//! # Invariants
//! - Cycles never overlap: the loop awaits each cycle before the next tick.
//! - Shutdown is observed between cycles; an in-flight cycle completes.

use crate::config::SyncConfig;
use crate::remote::RemoteTransport;
use crate::sync::engine::{SyncEngine, SyncReport};
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

const MIN_PERIOD: Duration = Duration::from_secs(1);

pub struct SyncScheduler;

impl SyncScheduler {
    /// Spawns the sync loop on the current Tokio runtime.
    pub fn start<T>(engine: Arc<SyncEngine<T>>, config: &SyncConfig) -> SyncHandle
    where
        T: RemoteTransport + 'static,
    {
        let period = config.interval().max(MIN_PERIOD);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let (report_tx, report_rx) = watch::channel::<Option<SyncReport>>(None);
        let trigger = Arc::new(Notify::new());
        let trigger_for_loop = trigger.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {}
                    () = trigger_for_loop.notified() => {}
                }

                let report = engine.run_cycle().await;
                report_tx.send_replace(Some(report));
            }

            info!("event=sync_scheduler module=sync status=stopped");
        });

        info!(
            "event=sync_scheduler module=sync status=started interval_secs={}",
            period.as_secs()
        );

        SyncHandle {
            shutdown_tx: Some(shutdown_tx),
            trigger,
            reports: report_rx,
            task: Some(task),
        }
    }
}

/// Owner handle of a running scheduler. Dropping it also stops the loop.
pub struct SyncHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    trigger: Arc<Notify>,
    reports: watch::Receiver<Option<SyncReport>>,
    task: Option<JoinHandle<()>>,
}

impl SyncHandle {
    /// Report of the most recently completed cycle.
    pub fn last_report(&self) -> Option<SyncReport> {
        *self.reports.borrow()
    }

    /// Receiver notified after every completed cycle.
    pub fn subscribe(&self) -> watch::Receiver<Option<SyncReport>> {
        self.reports.clone()
    }

    /// Requests an extra cycle without waiting for the next tick.
    pub fn trigger_now(&self) {
        self.trigger.notify_one();
    }

    /// Signals the loop to stop and waits for it to finish.
    pub async fn shutdown(mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                warn!("event=sync_scheduler module=sync status=error error_code=join_failed error={err}");
            }
        }
    }
}
