//! Probe cycle
//!
//! One fetch -> compare -> persist pass. Every failure is returned inside
//! the `ProbeOutcome` so the caller decides what is fatal.

use crate::config::{CorruptStatePolicy, ProbeConfig};
use crate::detector::{compare, ComparisonResult};
use crate::error::{ProbeError, StorageError};
use crate::fetch::Fetcher;
use crate::history::{ChangeRecord, HistoryLog};
use crate::snapshot::Snapshot;
use crate::store::StateStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a single probe cycle
#[derive(Debug, Default)]
pub struct ProbeOutcome {
    /// Absent when the cycle failed before comparison
    pub comparison: Option<ComparisonResult>,
    /// Absent when the fetch failed
    pub snapshot: Option<Snapshot>,
    /// True when `snapshot` was written to the store
    pub persisted: bool,
    /// Unreadable stored state that was set aside so the cycle could run as
    /// a first run. The cycle itself still succeeded.
    pub discarded_state: Option<StorageError>,
    pub error: Option<ProbeError>,
}

impl ProbeOutcome {
    fn failed(error: ProbeError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    /// Whether a change was detected; false when no comparison happened
    pub fn changed(&self) -> bool {
        self.comparison.as_ref().is_some_and(|c| c.changed)
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Runs probe cycles against one fetcher and one store
pub struct Prober {
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn StateStore>,
    options: ProbeConfig,
    history: Option<HistoryLog>,
    clock: Clock,
}

impl Prober {
    pub fn new(fetcher: Arc<dyn Fetcher>, store: Arc<dyn StateStore>) -> Self {
        Self {
            fetcher,
            store,
            options: ProbeConfig::default(),
            history: None,
            clock: Box::new(Utc::now),
        }
    }

    pub fn with_options(mut self, options: ProbeConfig) -> Self {
        self.options = options;
        self
    }

    pub fn with_history(mut self, history: HistoryLog) -> Self {
        self.history = Some(history);
        self
    }

    /// Override the capture clock
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Box::new(clock);
        self
    }

    pub async fn run_once(&self) -> ProbeOutcome {
        info!(target_desc = %self.fetcher.describe(), "Probing target");

        let content = match self.fetcher.fetch().await {
            Ok(content) => content,
            Err(e) => {
                warn!(error = %e, "Fetch failed; stored state left untouched");
                return ProbeOutcome::failed(ProbeError::Fetch(e));
            }
        };

        let mut discarded_state = None;
        let previous = match self.store.load() {
            Ok(previous) => previous,
            Err(e) if e.is_corrupt()
                && self.options.on_corrupt_state == CorruptStatePolicy::TreatAsFirstRun =>
            {
                warn!(error = %e, "Stored state is unreadable; treating this cycle as a first run");
                discarded_state = Some(e);
                None
            }
            Err(e) => return ProbeOutcome::failed(ProbeError::StorageRead(e)),
        };

        let comparison = compare(content.as_bytes(), previous.as_ref());
        let snapshot = Snapshot::capture(content, (self.clock)());
        debug!(
            changed = comparison.changed,
            fingerprint = %snapshot.fingerprint().short(),
            "Comparison complete"
        );

        let mut outcome = ProbeOutcome {
            discarded_state,
            ..ProbeOutcome::default()
        };

        if comparison.changed || self.options.refresh_unchanged {
            match self.store.save(&snapshot) {
                Ok(()) => outcome.persisted = true,
                Err(e) => {
                    warn!(error = %e, "Snapshot not persisted; next cycle compares against stale state");
                    outcome.error = Some(ProbeError::StorageWrite(e));
                }
            }
        }

        if comparison.changed {
            if let Some(history) = &self.history {
                if let Err(e) = history.append(&ChangeRecord::new(&snapshot, &comparison)) {
                    warn!(error = %e, path = %history.path().display(), "Failed to append change history");
                }
            }
        }

        outcome.comparison = Some(comparison);
        outcome.snapshot = Some(snapshot);
        outcome
    }
}
