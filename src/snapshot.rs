//! Snapshot: one persisted capture of fetched content

use crate::fingerprint::{fingerprint, Fingerprint};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One capture of fetched content plus its metadata.
///
/// The on-disk key names (`timestamp`, `content`, `hash`) are kept stable so
/// existing state files continue to load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "timestamp")]
    captured_at: DateTime<Utc>,
    content: String,
    #[serde(rename = "hash")]
    fingerprint: Fingerprint,
}

impl Snapshot {
    /// Capture content at the given time. The fingerprint is always derived
    /// from `content` here, never supplied by the caller.
    pub fn capture(content: String, captured_at: DateTime<Utc>) -> Self {
        let fingerprint = fingerprint(content.as_bytes());
        Self {
            captured_at,
            content,
            fingerprint,
        }
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// True when the stored fingerprint is the digest of the stored content.
    ///
    /// Only a deserialized snapshot can fail this.
    pub fn is_consistent(&self) -> bool {
        fingerprint(self.content.as_bytes()) == self.fingerprint
    }
}
