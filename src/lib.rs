//! # artifact-dl
//!
//! Concurrent batch downloader for validated binary artifacts.
//!
//! Given a list of URLs and a destination directory, artifact-dl fetches each
//! URL, checks that the response really is the expected file type (PDF by
//! default), writes it to disk and reports one structured outcome per URL.
//!
//! ## Design Philosophy
//!
//! artifact-dl is designed to be:
//! - **Bounded** - At most `max_concurrency` transfers are in flight at once
//! - **Resilient** - Transient failures are retried with exponential backoff
//! - **Partial-failure safe** - One failing URL never aborts the batch
//! - **Event-driven** - Consumers subscribe to progress events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use artifact_dl::{BatchDownloader, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = BatchDownloader::new(Config {
//!         max_concurrency: 4,
//!         ..Default::default()
//!     })?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let urls = [
//!         "https://arxiv.org/pdf/1706.03762",
//!         "https://arxiv.org/pdf/1810.04805",
//!     ];
//!     let report = downloader.download_batch(&urls, "papers").await?;
//!     println!("{report}");
//!
//!     downloader.shutdown().await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Batch orchestration
pub mod downloader;
/// Error types
pub mod error;
/// Concurrency limiting for in-flight transfers
pub mod limiter;
/// Retry state machine with exponential backoff
pub mod retry;
/// Shared HTTP transport
pub mod transport;
/// Core types and events
pub mod types;
/// Content validation
pub mod validator;
/// File naming and persistence
pub mod writer;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod test_helpers;

// Re-export commonly used types
pub use config::{ArtifactConfig, Config, RetryConfig};
pub use downloader::BatchDownloader;
pub use error::{Error, Result};
pub use limiter::ConcurrencyLimiter;
pub use retry::RetryController;
pub use transport::{HttpResponse, Transport, TransportError, TransportPool};
pub use types::{
    BatchCounts, BatchReport, DownloadOutcome, DownloadStatus, DownloadTask, Event,
};
pub use validator::{ContentValidator, Rejection};
pub use writer::FileWriter;

/// Download `urls` into `destination` with the default configuration
///
/// Builds a downloader, runs one batch and closes its transport pool before
/// returning, whatever the outcome of the individual URLs.
///
/// # Example
///
/// ```no_run
/// # async fn example() -> artifact_dl::Result<()> {
/// let report = artifact_dl::batch_download(
///     &["https://arxiv.org/pdf/1706.03762"],
///     "papers",
/// )
/// .await?;
///
/// for outcome in report.failures() {
///     eprintln!("{}: {}", outcome.source_url, outcome.detail);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn batch_download<S: AsRef<str>>(
    urls: &[S],
    destination: impl AsRef<std::path::Path>,
) -> Result<BatchReport> {
    let downloader = BatchDownloader::new(Config::default())?;
    let report = downloader.download_batch(urls, destination).await;
    downloader.shutdown().await;
    report
}
