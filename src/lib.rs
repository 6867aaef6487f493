//! Watchpost: Change Detection for Opaque Endpoints
//!
//! Periodically fetches a fixed endpoint, fingerprints the response, and
//! reports whether it changed since the last persisted capture.

pub mod cli;
pub mod config;
pub mod detector;
pub mod error;
pub mod fetch;
pub mod fingerprint;
pub mod history;
pub mod logging;
pub mod probe;
pub mod report;
pub mod scheduler;
pub mod snapshot;
pub mod store;

pub use detector::{compare, ChangeReason, ComparisonResult};
pub use error::{FetchError, MonitorError, ProbeError, StorageError};
pub use fingerprint::{fingerprint, Fingerprint};
pub use probe::{ProbeOutcome, Prober};
pub use scheduler::{RunSummary, Scheduler, SchedulerState, StopReason};
pub use snapshot::Snapshot;
pub use store::{JsonFileStore, MemoryStore, StateStore};
