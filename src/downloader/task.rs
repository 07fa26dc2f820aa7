//! One download, from slot acquisition to terminal outcome.

use crate::retry::{FetchResult, RetryController};
use crate::types::{DownloadOutcome, DownloadStatus, DownloadTask, Event};
use bytes::Bytes;
use tokio::time::Instant;
use url::Url;

use super::BatchDownloader;

const SHUT_DOWN_DETAIL: &str = "downloader is shut down";

impl BatchDownloader {
    /// Run one task to completion
    ///
    /// Never fails: every error becomes the outcome's status. The concurrency
    /// slot is held from the first request until the artifact is on disk and
    /// released on every path, including when the future is dropped. Tasks
    /// still waiting for a slot when the downloader shuts down end as
    /// `UnknownError` without a request.
    pub(super) async fn run_task(&self, task: &DownloadTask, url: &Url) -> DownloadOutcome {
        let permit = match self.limiter.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                tracing::warn!("Downloader shut down before the download could start");
                return DownloadOutcome::failure(
                    &task.source_url,
                    DownloadStatus::UnknownError,
                    SHUT_DOWN_DETAIL,
                    0,
                );
            }
        };

        let started = Instant::now();
        tracing::debug!(in_flight = self.limiter.in_flight(), "Download started");
        self.emit(Event::TaskStarted {
            url: task.source_url.clone(),
            index: task.index,
        });

        let controller = RetryController::new(
            self.transport.as_ref(),
            &self.validator,
            &self.config.retry,
        )
        .with_events(&self.event_tx);

        let outcome = match controller.run(url).await {
            FetchResult::Accepted { body, attempts } => self.persist(task, body, attempts).await,
            FetchResult::Failed {
                status,
                detail,
                attempts,
            } => DownloadOutcome::failure(&task.source_url, status, detail, attempts),
        };

        permit.release();
        outcome.with_elapsed(started.elapsed())
    }

    async fn persist(&self, task: &DownloadTask, body: Bytes, attempts: u32) -> DownloadOutcome {
        let path = task.target_path();
        let bytes = body.len();

        match self.writer.write(path.clone(), body).await {
            Ok(written) => {
                tracing::info!(path = %written.display(), bytes, attempts, "Download complete");
                DownloadOutcome::success(&task.source_url, written, attempts)
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to write artifact");
                DownloadOutcome::failure(
                    &task.source_url,
                    DownloadStatus::UnknownError,
                    format!("failed to write {}: {}", path.display(), e),
                    attempts,
                )
            }
        }
    }
}
