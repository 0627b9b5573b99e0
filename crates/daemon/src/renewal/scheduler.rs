//! Cycle scheduling
//!
//! Timer ticks, domain directory changes and SIGHUP all become [`Trigger`]s
//! sent into a single-slot queue. One task drains the queue and runs cycles,
//! so two cycles never overlap. A trigger arriving while a cycle runs fills
//! the slot; further triggers are dropped until the slot is consumed.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, trace};

use super::cycle::CycleRunner;
use crate::trigger::ShutdownCoordinator;

/// Why a cycle was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Timer,
    ConfigChanged,
    Signal,
}

/// Handle for requesting a cycle. Cheap to clone.
#[derive(Debug, Clone)]
pub struct TriggerSender {
    tx: mpsc::Sender<Trigger>,
}

impl TriggerSender {
    /// Request a cycle.
    ///
    /// Returns `false` if a cycle is already pending and this trigger was
    /// coalesced into it, or the scheduler has stopped.
    pub fn fire(&self, trigger: Trigger) -> bool {
        match self.tx.try_send(trigger) {
            Ok(()) => {
                trace!(trigger = ?trigger, "Queued cycle trigger");
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!(trigger = ?trigger, "Cycle already pending, trigger coalesced");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                trace!(trigger = ?trigger, "Scheduler stopped, trigger dropped");
                false
            }
        }
    }
}

/// Receiving side of the trigger queue
#[derive(Debug)]
pub struct TriggerQueue {
    rx: mpsc::Receiver<Trigger>,
}

impl TriggerQueue {
    /// Create the single-slot queue and its sender.
    pub fn channel() -> (TriggerSender, Self) {
        let (tx, rx) = mpsc::channel(1);
        (TriggerSender { tx }, Self { rx })
    }

    /// Wait for the next trigger. `None` once every sender is gone.
    pub async fn next(&mut self) -> Option<Trigger> {
        self.rx.recv().await
    }
}

/// Fire [`Trigger::Timer`] every `period`, starting immediately.
///
/// Ticks missed while the slot is full are not replayed.
pub async fn run_timer(period: Duration, sender: TriggerSender, shutdown: ShutdownCoordinator) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                sender.fire(Trigger::Timer);
            }
            () = shutdown.wait() => {
                debug!("Timer stopped");
                return;
            }
        }
    }
}

/// Consumes triggers and runs one cycle per trigger.
pub struct RenewalScheduler {
    runner: CycleRunner,
    queue: TriggerQueue,
    shutdown: ShutdownCoordinator,
}

impl RenewalScheduler {
    pub fn new(runner: CycleRunner, queue: TriggerQueue, shutdown: ShutdownCoordinator) -> Self {
        Self {
            runner,
            queue,
            shutdown,
        }
    }

    /// Run until shutdown is requested or every trigger sender is dropped.
    ///
    /// A configuration error aborts only the cycle it occurred in.
    pub async fn run(mut self) {
        info!(
            check_interval_minutes = self.runner.settings().check_interval.as_secs() / 60,
            "Starting certificate renewal scheduler"
        );

        loop {
            let trigger = tokio::select! {
                trigger = self.queue.next() => trigger,
                () = self.shutdown.wait() => None,
            };
            let Some(trigger) = trigger else {
                break;
            };

            debug!(trigger = ?trigger, "Running scheduled certificate check");
            if let Err(e) = self.runner.run_cycle().await {
                error!(error = %e, "Invalid domain configuration, cycle skipped");
            }

            if self.shutdown.is_shutdown_requested() {
                break;
            }
        }

        info!("Certificate renewal scheduler stopped");
    }
}
