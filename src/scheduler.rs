//! Periodic scheduler
//!
//! Drives probe cycles on a fixed interval until `max_runs` cycles have run
//! or the cancellation token fires. Cycles never overlap: the wait for the
//! next cycle starts only after the previous one has fully completed,
//! including persistence.

use crate::probe::ProbeOutcome;
use crate::report::{CycleReport, Reporter};
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Waiting,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    MaxRunsReached,
    Cancelled,
}

/// Tally of a finished run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub changes: u64,
    pub errors: u64,
    pub stop_reason: StopReason,
}

pub struct Scheduler {
    interval: Duration,
    max_runs: Option<u64>,
    cancel: CancellationToken,
    state: watch::Sender<SchedulerState>,
}

impl Scheduler {
    /// `max_runs = None` runs until cancelled; `Some(0)` runs no cycles.
    pub fn new(interval: Duration, max_runs: Option<u64>, cancel: CancellationToken) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self {
            interval,
            max_runs,
            cancel,
            state,
        }
    }

    /// Observe state transitions
    pub fn state(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    fn limit_reached(&self, cycles: u64) -> bool {
        self.max_runs.is_some_and(|max| cycles >= max)
    }

    fn transition(&self, next: SchedulerState) {
        debug!(state = ?next, "Scheduler state");
        self.state.send_replace(next);
    }

    /// Run cycles until stopped.
    ///
    /// Cancellation is checked before each cycle and during each wait. A
    /// cycle already in progress is allowed to finish so its snapshot is
    /// never half-persisted.
    pub async fn run<F, Fut>(&self, mut probe: F, reporter: &dyn Reporter) -> RunSummary
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ProbeOutcome>,
    {
        let mut cycles = 0u64;
        let mut changes = 0u64;
        let mut errors = 0u64;

        let stop_reason = loop {
            if self.cancel.is_cancelled() {
                break StopReason::Cancelled;
            }
            if self.limit_reached(cycles) {
                break StopReason::MaxRunsReached;
            }

            self.transition(SchedulerState::Running);
            cycles += 1;
            let outcome = probe().await;
            if outcome.changed() {
                changes += 1;
            }
            if !outcome.is_ok() {
                errors += 1;
            }
            reporter.report(&CycleReport::from_outcome(cycles, &outcome));

            // No wait after the last cycle
            if self.limit_reached(cycles) {
                break StopReason::MaxRunsReached;
            }
            if self.cancel.is_cancelled() {
                break StopReason::Cancelled;
            }

            self.transition(SchedulerState::Waiting);
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break StopReason::Cancelled,
                _ = tokio::time::sleep(self.interval) => {}
            }
        };

        self.transition(SchedulerState::Stopped);
        info!(cycles, changes, errors, reason = ?stop_reason, "Scheduler stopped");

        RunSummary {
            cycles,
            changes,
            errors,
            stop_reason,
        }
    }
}
