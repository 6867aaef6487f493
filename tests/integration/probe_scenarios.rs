//! End-to-end probe cycles against a file-backed store

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use tempfile::TempDir;
use watchpost::fetch::{Fetcher, FnFetcher};
use watchpost::history::HistoryLog;
use watchpost::report::CycleReport;
use watchpost::{
    fingerprint, ChangeReason, FetchError, JsonFileStore, ProbeError, Prober, Snapshot,
    StateStore, StorageError,
};

fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap()
}

fn returning(content: &'static str) -> Arc<dyn Fetcher> {
    Arc::new(FnFetcher(move || async move {
        Ok::<_, FetchError>(content.to_string())
    }))
}

#[tokio::test]
async fn test_first_run_on_empty_store() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFileStore::new(temp_dir.path().join("state.json")));
    let prober = Prober::new(returning("{\"a\":1}"), store.clone()).with_clock(|| at(0));

    let outcome = prober.run_once().await;

    assert!(outcome.is_ok());
    assert!(outcome.changed());
    assert_eq!(outcome.comparison.unwrap().reason, ChangeReason::FirstRun);

    let stored = store.load().unwrap().unwrap();
    assert_eq!(stored.content(), "{\"a\":1}");
    assert_eq!(stored.fingerprint(), &fingerprint(b"{\"a\":1}"));
}

#[tokio::test]
async fn test_same_content_refreshes_only_timestamp() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFileStore::new(temp_dir.path().join("state.json")));
    store
        .save(&Snapshot::capture("X".to_string(), at(0)))
        .unwrap();

    let prober = Prober::new(returning("X"), store.clone()).with_clock(|| at(5));
    let outcome = prober.run_once().await;

    assert!(outcome.is_ok());
    assert!(!outcome.changed());
    assert_eq!(
        outcome.comparison.unwrap().reason,
        ChangeReason::Unchanged { since: at(0) }
    );

    let stored = store.load().unwrap().unwrap();
    assert_eq!(stored.captured_at(), at(5));
    assert_eq!(stored.content(), "X");
    assert_eq!(stored.fingerprint(), &fingerprint(b"X"));
}

#[tokio::test]
async fn test_new_content_is_reported_and_stored() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFileStore::new(temp_dir.path().join("state.json")));
    store
        .save(&Snapshot::capture("X".to_string(), at(0)))
        .unwrap();

    let prober = Prober::new(returning("Y"), store.clone()).with_clock(|| at(5));
    let outcome = prober.run_once().await;

    assert!(outcome.changed());
    let comparison = outcome.comparison.unwrap();
    assert_eq!(comparison.reason, ChangeReason::Changed { since: at(0) });
    assert!(comparison.reason.to_string().contains(&at(0).to_rfc3339()));
    assert_eq!(store.load().unwrap().unwrap().content(), "Y");
}

#[tokio::test]
async fn test_transport_failure_leaves_file_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("state.json");
    let store = Arc::new(JsonFileStore::new(&path));
    store
        .save(&Snapshot::capture("X".to_string(), at(0)))
        .unwrap();
    let before = std::fs::read(&path).unwrap();

    let fetcher: Arc<dyn Fetcher> = Arc::new(FnFetcher(|| async {
        Err::<String, _>(FetchError::Status {
            status: 503,
            message: "unavailable".to_string(),
        })
    }));
    let outcome = Prober::new(fetcher, store).run_once().await;

    assert!(matches!(outcome.error, Some(ProbeError::Fetch(_))));
    assert!(!outcome.changed());
    assert!(outcome.snapshot.is_none());
    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[tokio::test]
async fn test_corrupt_file_is_overwritten_under_default_policy() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("state.json");
    std::fs::write(&path, "{ truncated").unwrap();

    let store = Arc::new(JsonFileStore::new(&path));
    let outcome = Prober::new(returning("X"), store.clone()).run_once().await;

    assert!(outcome.is_ok());
    assert!(
        matches!(&outcome.discarded_state, Some(StorageError::Corrupt { path: p, .. }) if *p == path),
        "discarded state must be surfaced: {:?}",
        outcome.discarded_state
    );
    let report = CycleReport::from_outcome(1, &outcome);
    assert!(report.error.is_none());
    assert!(report.warning.is_some());
    assert_eq!(outcome.comparison.unwrap().reason, ChangeReason::FirstRun);
    assert_eq!(store.load().unwrap().unwrap().content(), "X");
}

#[tokio::test]
async fn test_genuine_first_run_has_no_warning() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFileStore::new(temp_dir.path().join("state.json")));

    let outcome = Prober::new(returning("X"), store).run_once().await;

    assert!(outcome.discarded_state.is_none());
    assert!(CycleReport::from_outcome(1, &outcome).warning.is_none());
}

#[tokio::test]
async fn test_changes_are_appended_to_history() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFileStore::new(temp_dir.path().join("state.json")));
    let history_path = temp_dir.path().join("changes.jsonl");

    for content in ["X", "X", "Y"] {
        let prober = Prober::new(returning(content), store.clone())
            .with_history(HistoryLog::new(&history_path));
        prober.run_once().await;
    }

    let records = HistoryLog::new(&history_path).read_all().unwrap();
    assert_eq!(records.len(), 2, "only first run and the X -> Y change are recorded");
    assert_eq!(records[0].reason, "first run");
    assert_eq!(records[1].fingerprint, fingerprint(b"Y").to_hex());
    assert_eq!(
        records[1].previous_fingerprint.as_deref(),
        Some(fingerprint(b"X").to_hex().as_str())
    );
}
