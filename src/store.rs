//! State Store
//!
//! Durable load/save of the last-seen snapshot for the monitored target.
//! The file-backed store writes atomically (unique temp file, fsync, rename)
//! so a reader always observes either the old or the new complete snapshot,
//! even with several writers on the same path.

use crate::error::StorageError;
use crate::snapshot::Snapshot;
use parking_lot::Mutex;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Storage for the single last-known snapshot
pub trait StateStore: Send + Sync {
    /// Load the most recently saved snapshot.
    ///
    /// `Ok(None)` means no prior state. Unreadable state is
    /// `Err(StorageError::Corrupt)`, never `Ok(None)`.
    fn load(&self) -> Result<Option<Snapshot>, StorageError>;

    /// Replace the stored snapshot.
    fn save(&self, snapshot: &Snapshot) -> Result<(), StorageError>;
}

/// JSON file store, one pretty-printed document per state file
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> Result<Option<Snapshot>, StorageError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(&self.path, e)),
        };

        let snapshot: Snapshot =
            serde_json::from_slice(&bytes).map_err(|e| StorageError::Corrupt {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        if !snapshot.is_consistent() {
            return Err(StorageError::Corrupt {
                path: self.path.clone(),
                reason: "stored hash does not match stored content".to_string(),
            });
        }

        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), StorageError> {
        // Temp file lives next to the target so the rename never crosses filesystems
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|e| self.io_error(parent, e))?;

        let serialized = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| StorageError::Serialize(e.to_string()))?;

        // Each writer gets its own uniquely named temp file; it is removed on drop
        let mut temp_file = NamedTempFile::new_in(parent).map_err(|e| self.io_error(parent, e))?;
        temp_file
            .write_all(&serialized)
            .and_then(|()| temp_file.as_file().sync_all())
            .map_err(|e| self.io_error(temp_file.path(), e))?;

        temp_file
            .persist(&self.path)
            .map_err(|e| self.io_error(&self.path, e.error))?;

        debug!(
            path = %self.path.display(),
            fingerprint = %snapshot.fingerprint().short(),
            bytes = serialized.len(),
            "Snapshot saved"
        );
        Ok(())
    }
}

/// In-memory store for tests and embedders that persist elsewhere
#[derive(Default)]
pub struct MemoryStore {
    snapshot: Mutex<Option<Snapshot>>,
    saves: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
            saves: Mutex::new(0),
        }
    }

    /// Number of successful `save` calls
    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<Option<Snapshot>, StorageError> {
        Ok(self.snapshot.lock().clone())
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), StorageError> {
        *self.snapshot.lock() = Some(snapshot.clone());
        *self.saves.lock() += 1;
        Ok(())
    }
}
