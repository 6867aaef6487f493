//! Change detection
//!
//! Classifies freshly fetched content against the previously stored
//! snapshot. Comparison is on fingerprint equality only: two payloads that
//! collide in the digest space are reported as unchanged.

use crate::fingerprint::fingerprint;
use crate::snapshot::Snapshot;
use chrono::{DateTime, Utc};
use std::fmt;

/// Why a comparison came out the way it did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeReason {
    /// No prior snapshot existed
    FirstRun,
    /// Fingerprint differs from the snapshot captured at `since`
    Changed { since: DateTime<Utc> },
    /// Fingerprint matches the snapshot captured at `since`
    Unchanged { since: DateTime<Utc> },
}

impl fmt::Display for ChangeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeReason::FirstRun => write!(f, "first run"),
            ChangeReason::Changed { since } => {
                write!(f, "content changed (last capture: {})", since.to_rfc3339())
            }
            ChangeReason::Unchanged { since } => {
                write!(f, "content unchanged (last capture: {})", since.to_rfc3339())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonResult {
    pub changed: bool,
    pub reason: ChangeReason,
    pub previous: Option<Snapshot>,
}

/// Compare new content against the previous snapshot, if any.
pub fn compare(new_content: &[u8], previous: Option<&Snapshot>) -> ComparisonResult {
    let Some(previous) = previous else {
        return ComparisonResult {
            changed: true,
            reason: ChangeReason::FirstRun,
            previous: None,
        };
    };

    let since = previous.captured_at();
    let changed = fingerprint(new_content) != *previous.fingerprint();
    let reason = if changed {
        ChangeReason::Changed { since }
    } else {
        ChangeReason::Unchanged { since }
    };

    ComparisonResult {
        changed,
        reason,
        previous: Some(previous.clone()),
    }
}
