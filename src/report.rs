//! Per-cycle reporting
//!
//! The scheduler hands every cycle's outcome to a `Reporter` and never
//! formats output itself.

use crate::probe::ProbeOutcome;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

/// Structured per-cycle event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// 1-based cycle number within the run
    pub cycle: u64,
    pub changed: bool,
    pub reason: Option<String>,
    pub fingerprint: Option<String>,
    /// Set when unreadable stored state was discarded during the cycle
    pub warning: Option<String>,
    pub error: Option<String>,
}

impl CycleReport {
    pub fn from_outcome(cycle: u64, outcome: &ProbeOutcome) -> Self {
        Self {
            cycle,
            changed: outcome.changed(),
            reason: outcome.comparison.as_ref().map(|c| c.reason.to_string()),
            fingerprint: outcome.snapshot.as_ref().map(|s| s.fingerprint().to_hex()),
            warning: outcome
                .discarded_state
                .as_ref()
                .map(|e| format!("Discarded unreadable stored state: {}", e)),
            error: outcome.error.as_ref().map(|e| e.to_string()),
        }
    }
}

pub trait Reporter: Send + Sync {
    fn report(&self, report: &CycleReport);
}

/// Reports cycles as structured `tracing` events
#[derive(Debug, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, report: &CycleReport) {
        let reason = report.reason.as_deref().unwrap_or("-");
        if let Some(warning) = &report.warning {
            warn!(cycle = report.cycle, warning = %warning, "Probe cycle recovered");
        }
        match &report.error {
            Some(error) => warn!(
                cycle = report.cycle,
                changed = report.changed,
                reason,
                error = %error,
                "Probe cycle failed"
            ),
            None if report.changed => info!(
                cycle = report.cycle,
                fingerprint = report.fingerprint.as_deref().unwrap_or("-"),
                reason,
                "Change detected"
            ),
            None => info!(cycle = report.cycle, reason, "No change detected"),
        }
    }
}

/// Keeps every report in memory
#[derive(Debug, Default)]
pub struct MemoryReporter {
    reports: Mutex<Vec<CycleReport>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<CycleReport> {
        self.reports.lock().clone()
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, report: &CycleReport) {
        self.reports.lock().push(report.clone());
    }
}
