use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

use crate::services::alert_monitor::AlertMonitor;

struct Worker {
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Owns the periodic trigger loop. `Stopped` until [`start`](Self::start),
/// back to `Stopped` after [`stop`](Self::stop). Both are idempotent.
pub struct AlertScheduler {
    monitor: Arc<AlertMonitor>,
    period: Duration,
    worker: Mutex<Option<Worker>>,
}

impl AlertScheduler {
    pub fn new(monitor: Arc<AlertMonitor>) -> Self {
        let period = monitor.settings().tick_interval;
        Self {
            monitor,
            period,
            worker: Mutex::new(None),
        }
    }

    // false if already running
    pub async fn start(&self) -> bool {
        let mut worker = self.worker.lock().await;

        if worker.as_ref().is_some_and(|w| !w.handle.is_finished()) {
            return false;
        }

        let (cancel, cancel_rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(self.monitor.clone(), self.period, cancel_rx));
        *worker = Some(Worker { cancel, handle });

        tracing::info!(period_ms = self.period.as_millis() as u64, "alert scheduler started");
        true
    }

    // waits for the loop to exit; false if it was not running
    pub async fn stop(&self) -> bool {
        let mut worker = self.worker.lock().await;

        let Some(w) = worker.take() else {
            return false;
        };

        let _ = w.cancel.send(true);
        if let Err(e) = w.handle.await {
            tracing::error!(error = %e, "alert scheduler worker ended abnormally");
        }

        tracing::info!("alert scheduler stopped");
        true
    }

    pub async fn is_running(&self) -> bool {
        self.worker
            .lock()
            .await
            .as_ref()
            .is_some_and(|w| !w.handle.is_finished())
    }
}

async fn run_loop(monitor: Arc<AlertMonitor>, period: Duration, mut cancel: watch::Receiver<bool>) {
    let mut interval = time::interval(period);
    // a slow tick delays the next one instead of bursting to catch up
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = cancel.changed() => break,

            _ = interval.tick() => {
                if *cancel.borrow() {
                    break;
                }

                match monitor.run_tick(&cancel).await {
                    Ok(report) => {
                        if report.fired > 0 || report.eval_failures > 0 || report.persist_failures > 0 {
                            tracing::info!(?report, "alert tick finished");
                        } else {
                            tracing::debug!(?report, "alert tick finished");
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "could not load active alerts, skipping tick");
                    }
                }
            }
        }
    }
}
