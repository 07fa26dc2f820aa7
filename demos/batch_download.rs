//! Batch download example
//!
//! This example demonstrates the core functionality of artifact-dl:
//! - Configuring concurrency and retries
//! - Injecting a logger instead of installing a global one
//! - Subscribing to progress events
//! - Reading the per-URL report
//!
//! ```bash
//! RUST_LOG=artifact_dl=debug cargo run --example batch_download -- \
//!     https://arxiv.org/pdf/1706.03762 https://arxiv.org/pdf/1810.04805
//! ```

use artifact_dl::{BatchDownloader, Config, DownloadStatus, Event, RetryConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut urls: Vec<String> = std::env::args().skip(1).collect();
    if urls.is_empty() {
        urls = vec![
            "https://arxiv.org/pdf/1706.03762".to_string(),
            "https://arxiv.org/pdf/1810.04805".to_string(),
            "https://arxiv.org/abs/1706.03762".to_string(),
        ];
    }

    // Logs go to this subscriber only while the batch runs
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("artifact_dl=info")),
        )
        .with_target(false)
        .finish();

    let config = Config {
        max_concurrency: 3,
        retry: RetryConfig {
            max_retries: 3,
            jitter: true,
            ..Default::default()
        },
        ..Default::default()
    };

    let downloader =
        BatchDownloader::new(config)?.with_dispatch(tracing::Dispatch::new(subscriber));

    // Subscribe to events
    let mut events = downloader.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                Event::BatchStarted { total } => {
                    println!("Starting {} downloads", total);
                }
                Event::Retrying {
                    url, delay, reason, ..
                } => {
                    println!("↻ {} ({}), retrying in {:?}", url, reason, delay);
                }
                Event::TaskFinished {
                    outcome,
                    completed,
                    total,
                } => {
                    let mark = match outcome.status {
                        DownloadStatus::Success => "✓",
                        _ => "✗",
                    };
                    println!(
                        "{} [{}/{}] {}: {}",
                        mark, completed, total, outcome.source_url, outcome.detail
                    );
                }
                Event::BatchFinished { .. } => break,
                _ => {}
            }
        }
    });

    let report = downloader.download_batch(&urls, "downloads").await?;
    downloader.shutdown().await;
    printer.await?;

    println!("\n{}", report);

    Ok(())
}
