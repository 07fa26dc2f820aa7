//! Running a planned batch and assembling the report.

use crate::error::{Error, Result};
use crate::types::{BatchReport, DownloadOutcome, Event};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::Instrument;
use tracing::instrument::WithSubscriber;

use super::BatchDownloader;
use super::plan::{PlannedTask, plan_batch};

impl BatchDownloader {
    /// Download every URL into `destination`
    ///
    /// Creates `destination` (and missing parents) first. One task is planned
    /// per distinct URL; at most `max_concurrency` of them transfer at once.
    /// A failing URL never affects the others: the report holds exactly one
    /// outcome per distinct URL, in request order, whatever happened.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Destination`] if the directory cannot be created. No
    /// request is made in that case.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use artifact_dl::{BatchDownloader, Config};
    ///
    /// # async fn example() -> artifact_dl::Result<()> {
    /// let downloader = BatchDownloader::new(Config::default())?;
    /// let report = downloader
    ///     .download_batch(&["https://arxiv.org/pdf/1706.03762"], "papers")
    ///     .await?;
    /// println!("{report}");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn download_batch<S: AsRef<str>>(
        &self,
        urls: &[S],
        destination: impl AsRef<Path>,
    ) -> Result<BatchReport> {
        let run = self.run_batch(urls, destination.as_ref());
        match &self.dispatch {
            Some(dispatch) => run.with_subscriber(dispatch.clone()).await,
            None => run.await,
        }
    }

    /// Download a single URL into `destination`
    pub async fn download(
        &self,
        url: &str,
        destination: impl AsRef<Path>,
    ) -> Result<DownloadOutcome> {
        self.download_batch(&[url], destination)
            .await?
            .into_outcomes()
            .into_iter()
            .next()
            .ok_or_else(|| Error::Other(format!("no outcome recorded for {url}")))
    }

    async fn run_batch<S: AsRef<str>>(
        &self,
        urls: &[S],
        destination: &Path,
    ) -> Result<BatchReport> {
        tokio::fs::create_dir_all(destination)
            .await
            .map_err(|e| Error::Destination {
                path: destination.to_path_buf(),
                reason: e.to_string(),
            })?;

        let planned = plan_batch(urls, destination, &self.writer);
        let total = planned.len();

        tracing::info!(
            total,
            destination = %destination.display(),
            max_concurrency = self.config.max_concurrency,
            "Starting batch"
        );
        self.emit(Event::BatchStarted { total });

        let completed = AtomicUsize::new(0);
        let tasks = planned.into_iter().map(|planned| {
            let completed = &completed;
            async move {
                let outcome = match planned {
                    PlannedTask::Ready { task, url } => {
                        let span = tracing::info_span!(
                            "download",
                            url = %task.source_url,
                            index = task.index
                        );
                        self.run_task(&task, &url).instrument(span).await
                    }
                    PlannedTask::Rejected {
                        index,
                        source_url,
                        status,
                        reason,
                    } => {
                        tracing::warn!(url = %source_url, index, %reason, "Skipping URL");
                        DownloadOutcome::failure(source_url, status, reason, 0)
                    }
                };

                let completed = completed.fetch_add(1, Ordering::SeqCst) + 1;
                tracing::debug!(
                    url = %outcome.source_url,
                    status = %outcome.status,
                    completed,
                    total,
                    "Task finished"
                );
                self.emit(Event::TaskFinished {
                    outcome: outcome.clone(),
                    completed,
                    total,
                });
                outcome
            }
        });

        // join_all keeps results in input order regardless of completion order
        let outcomes = futures::future::join_all(tasks).await;
        let report = BatchReport::from_outcomes(outcomes);
        let counts = report.counts();

        tracing::info!(
            total = counts.total,
            succeeded = counts.succeeded,
            failed = counts.failed,
            "Batch finished"
        );
        self.emit(Event::BatchFinished { counts });

        Ok(report)
    }
}
