//! Custom test assertions for integration tests

use artifact_dl::{BatchReport, DownloadOutcome, DownloadStatus, Event};
use std::path::Path;
use tokio::sync::broadcast;

/// Assert that `url` ended with `status` after `attempts` requests
pub fn assert_outcome(
    report: &BatchReport,
    url: &str,
    status: DownloadStatus,
    attempts: u32,
) -> DownloadOutcome {
    let outcome = report
        .get(url)
        .unwrap_or_else(|| panic!("no outcome for {url}"))
        .clone();
    assert_eq!(outcome.status, status, "{url}: {}", outcome.detail);
    assert_eq!(outcome.attempts, attempts, "{url}: unexpected attempt count");
    assert_eq!(
        outcome.written_path.is_some(),
        status == DownloadStatus::Success,
        "{url}: written_path must be set exactly on success"
    );
    outcome
}

/// Sorted names of the files directly inside `dir`
pub fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("read destination")
        .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Every event already buffered on `rx`
pub fn drain_events(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
