//! Change history
//!
//! Append-only JSON-lines log with one record per detected change. The
//! state file only keeps the latest snapshot; this keeps the trail.

use crate::detector::ComparisonResult;
use crate::error::StorageError;
use crate::snapshot::Snapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// One detected change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub detected_at: DateTime<Utc>,
    pub fingerprint: String,
    pub previous_fingerprint: Option<String>,
    pub previous_captured_at: Option<DateTime<Utc>>,
    pub reason: String,
}

impl ChangeRecord {
    pub fn new(snapshot: &Snapshot, comparison: &ComparisonResult) -> Self {
        let previous = comparison.previous.as_ref();
        Self {
            detected_at: snapshot.captured_at(),
            fingerprint: snapshot.fingerprint().to_hex(),
            previous_fingerprint: previous.map(|p| p.fingerprint().to_hex()),
            previous_captured_at: previous.map(|p| p.captured_at()),
            reason: comparison.reason.to_string(),
        }
    }
}

pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &ChangeRecord) -> Result<(), StorageError> {
        let io_error = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_error)?;
            }
        }

        let mut line =
            serde_json::to_string(record).map_err(|e| StorageError::Serialize(e.to_string()))?;
        line.push('\n');

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_error)?;
        file.write_all(line.as_bytes()).map_err(io_error)?;
        Ok(())
    }

    /// All records, oldest first. A missing file is an empty history.
    pub fn read_all(&self) -> Result<Vec<ChangeRecord>, StorageError> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let mut records = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|source| StorageError::Io {
                path: self.path.clone(),
                source,
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line).map_err(|e| StorageError::Corrupt {
                path: self.path.clone(),
                reason: format!("line {}: {}", index + 1, e),
            })?;
            records.push(record);
        }
        Ok(records)
    }
}
