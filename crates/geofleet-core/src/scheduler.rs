//! Periodic timer driving [`PositionSimulator`] ticks.
//!
//! The scheduler owns one Tokio task and one [`tokio::time::Interval`].
//! Stopping is cooperative: [`SchedulerHandle::stop`] flips a watch
//! channel that the loop checks only between ticks, so a tick that is
//! already running always completes before the task exits.
//!
//! A failed tick (store unreachable) is logged, counted as skipped, and
//! retried at the next interval. Slow ticks delay the following tick
//! instead of triggering a burst of catch-up ticks.

use std::sync::Arc;
use std::time::Duration;

use geofleet_db::EntityStore;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::simulator::{PositionSimulator, TickSummary};

/// Errors surfaced when waiting for the scheduler task.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// The scheduler task panicked or was aborted.
    #[error("scheduler task failed: {0}")]
    Join(#[from] JoinError),
}

/// Why the scheduler loop exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A stop was requested or every handle was dropped.
    Requested,
    /// The configured tick limit was reached.
    MaxTicksReached,
}

/// Outcome of a scheduler run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerReport {
    /// Why the loop exited.
    pub stop_reason: StopReason,
    /// Ticks that ran to completion.
    pub ticks_completed: u64,
    /// Ticks skipped because the snapshot could not be read.
    pub ticks_skipped: u64,
    /// Summary of the last completed tick.
    pub last_summary: Option<TickSummary>,
}

/// Tick timing and bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scheduler {
    interval: Duration,
    max_ticks: u64,
}

impl Scheduler {
    /// A scheduler firing every `interval`. `max_ticks == 0` means unbounded.
    pub const fn new(interval: Duration, max_ticks: u64) -> Self {
        Self { interval, max_ticks }
    }

    /// Spawn the tick loop. The first tick fires immediately.
    pub fn start<S>(&self, simulator: Arc<PositionSimulator<S>>) -> SchedulerHandle
    where
        S: EntityStore + 'static,
    {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(run_loop(*self, simulator, shutdown_rx));
        SchedulerHandle {
            stop: StopHandle {
                shutdown: Arc::new(shutdown),
            },
            join,
        }
    }
}

/// Cloneable stop trigger, usable from a signal-handling task.
#[derive(Debug, Clone)]
pub struct StopHandle {
    shutdown: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    /// Ask the loop to exit after the in-flight tick, if any.
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }
}

/// Control handle for a running scheduler.
///
/// Dropping the handle (and every [`StopHandle`]) stops the loop.
#[derive(Debug)]
pub struct SchedulerHandle {
    stop: StopHandle,
    join: JoinHandle<SchedulerReport>,
}

impl SchedulerHandle {
    /// Ask the loop to exit after the in-flight tick, if any.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// A stop trigger that outlives borrows of this handle.
    pub fn stopper(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Wait for the loop to exit on its own (tick limit or prior `stop`).
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Join`] if the task panicked.
    pub async fn wait(self) -> Result<SchedulerReport, SchedulerError> {
        Ok(self.join.await?)
    }

    /// Stop the loop and wait for the in-flight tick to finish.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Join`] if the task panicked.
    pub async fn shutdown(self) -> Result<SchedulerReport, SchedulerError> {
        self.stop();
        self.wait().await
    }
}

async fn run_loop<S: EntityStore>(
    scheduler: Scheduler,
    simulator: Arc<PositionSimulator<S>>,
    mut shutdown: watch::Receiver<bool>,
) -> SchedulerReport {
    let mut ticker = tokio::time::interval(scheduler.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut ticks_completed: u64 = 0;
    let mut ticks_skipped: u64 = 0;
    let mut last_summary: Option<TickSummary> = None;

    info!(
        interval_secs = scheduler.interval.as_secs_f64(),
        max_ticks = scheduler.max_ticks,
        "Scheduler started"
    );

    let stop_reason = loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break StopReason::Requested,
            _ = ticker.tick() => {}
        }

        match simulator.tick().await {
            Ok(summary) => {
                ticks_completed = ticks_completed.saturating_add(1);
                info!(
                    tick = summary.tick,
                    moved = summary.vehicles_moved,
                    failed = summary.vehicles_failed,
                    rejected = summary.vehicles_rejected,
                    alerts = summary.alerts_emitted,
                    suppressed = summary.alerts_suppressed,
                    "Tick complete"
                );
                last_summary = Some(summary);
            }
            Err(e) => {
                ticks_skipped = ticks_skipped.saturating_add(1);
                error!(error = %e, "Tick skipped");
            }
        }

        let attempted = ticks_completed.saturating_add(ticks_skipped);
        if scheduler.max_ticks > 0 && attempted >= scheduler.max_ticks {
            info!(max_ticks = scheduler.max_ticks, "Tick limit reached");
            break StopReason::MaxTicksReached;
        }
    };

    info!(
        reason = ?stop_reason,
        ticks_completed,
        ticks_skipped,
        "Scheduler stopped"
    );
    SchedulerReport {
        stop_reason,
        ticks_completed,
        ticks_skipped,
        last_summary,
    }
}
