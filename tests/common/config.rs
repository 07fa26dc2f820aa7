//! Test configuration helpers for creating downloaders against a mock server

use artifact_dl::{BatchDownloader, Config, RetryConfig};
use std::time::Duration;
use tempfile::TempDir;

/// Config with millisecond backoff and a short request timeout
pub fn fast_config(max_concurrency: usize) -> Config {
    Config {
        max_concurrency,
        timeout: Duration::from_secs(5),
        retry: RetryConfig {
            initial_delay: Duration::from_millis(20),
            max_delay: Duration::from_millis(100),
            ..RetryConfig::default()
        },
        ..Config::default()
    }
}

/// Create a downloader and a temporary destination directory
///
/// The directory is deleted when the returned `TempDir` is dropped.
pub fn create_test_downloader(config: Config) -> (BatchDownloader, TempDir) {
    let downloader = BatchDownloader::new(config).expect("valid test config");
    let dir = tempfile::tempdir().expect("create temp dir");
    (downloader, dir)
}
