//! Core types for artifact-dl

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// One requested download
///
/// Created when a batch starts, before any transfer, and never modified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadTask {
    /// Position of the URL in the (deduplicated) request
    pub index: usize,
    /// The URL as the caller supplied it
    pub source_url: String,
    /// Directory the artifact is written into
    pub destination_dir: PathBuf,
    /// File name planned for this task, unique within the batch
    pub file_name: String,
}

impl DownloadTask {
    /// Final path of the artifact if the download succeeds
    pub fn target_path(&self) -> PathBuf {
        self.destination_dir.join(&self.file_name)
    }
}

/// Terminal classification of a download
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    /// Artifact validated and written to disk
    Success,
    /// Server denied access (HTTP 403)
    Forbidden,
    /// Resource absent (HTTP 404), invalid URL, or not the expected format
    NotFound,
    /// Transport failure (DNS, TLS, connect, timeout) on the last attempt
    NetworkError,
    /// Unexpected HTTP status on the last attempt, or anything else
    UnknownError,
}

impl DownloadStatus {
    /// Whether this status is [`DownloadStatus::Success`]
    pub fn is_success(&self) -> bool {
        matches!(self, DownloadStatus::Success)
    }

    /// Whether the failure class is transient and may succeed on a later attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            DownloadStatus::NetworkError | DownloadStatus::UnknownError => true,
            DownloadStatus::Success | DownloadStatus::Forbidden | DownloadStatus::NotFound => {
                false
            }
        }
    }

    /// Stable machine-readable name
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadStatus::Success => "success",
            DownloadStatus::Forbidden => "forbidden",
            DownloadStatus::NotFound => "not_found",
            DownloadStatus::NetworkError => "network_error",
            DownloadStatus::UnknownError => "unknown_error",
        }
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one download task, produced exactly once per task
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DownloadOutcome {
    /// The URL as the caller supplied it
    pub source_url: String,
    /// Terminal classification
    pub status: DownloadStatus,
    /// Human-readable explanation (written path on success, failure reason otherwise)
    pub detail: String,
    /// Path of the written artifact; set if and only if `status` is `Success`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub written_path: Option<PathBuf>,
    /// Number of GET requests performed
    pub attempts: u32,
    /// Wall time from first attempt to terminal status
    pub elapsed: Duration,
}

impl DownloadOutcome {
    /// Successful outcome for a written file
    pub fn success(source_url: impl Into<String>, path: PathBuf, attempts: u32) -> Self {
        Self {
            source_url: source_url.into(),
            status: DownloadStatus::Success,
            detail: format!("downloaded to {}", path.display()),
            written_path: Some(path),
            attempts,
            elapsed: Duration::ZERO,
        }
    }

    /// Failed outcome; `status` must not be `Success`
    pub fn failure(
        source_url: impl Into<String>,
        status: DownloadStatus,
        detail: impl Into<String>,
        attempts: u32,
    ) -> Self {
        debug_assert!(!status.is_success(), "failure outcome with Success status");
        Self {
            source_url: source_url.into(),
            status,
            detail: detail.into(),
            written_path: None,
            attempts,
            elapsed: Duration::ZERO,
        }
    }

    pub(crate) fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    /// Whether the download succeeded
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Aggregate counts of a batch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCounts {
    /// Number of distinct URLs in the batch
    pub total: usize,
    /// Number of `Success` outcomes
    pub succeeded: usize,
    /// Number of non-`Success` outcomes
    pub failed: usize,
}

/// Outcome of a whole batch: one [`DownloadOutcome`] per distinct requested URL
///
/// Iteration follows request order regardless of completion order.
#[derive(Clone, Debug, Default)]
pub struct BatchReport {
    outcomes: Vec<DownloadOutcome>,
    index: HashMap<String, usize>,
}

impl BatchReport {
    /// Build a report from outcomes already in request order
    ///
    /// A URL appearing more than once keeps only its first outcome.
    pub fn from_outcomes(outcomes: impl IntoIterator<Item = DownloadOutcome>) -> Self {
        let mut report = Self::default();
        for outcome in outcomes {
            if report.index.contains_key(&outcome.source_url) {
                continue;
            }
            report
                .index
                .insert(outcome.source_url.clone(), report.outcomes.len());
            report.outcomes.push(outcome);
        }
        report
    }

    /// Outcome for a URL, if it was part of the batch
    pub fn get(&self, url: &str) -> Option<&DownloadOutcome> {
        self.index.get(url).map(|&i| &self.outcomes[i])
    }

    /// Outcomes in request order
    pub fn iter(&self) -> impl Iterator<Item = &DownloadOutcome> {
        self.outcomes.iter()
    }

    /// Number of entries (distinct URLs)
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether the batch was empty
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Aggregate counts
    pub fn counts(&self) -> BatchCounts {
        let succeeded = self.outcomes.iter().filter(|o| o.is_success()).count();
        BatchCounts {
            total: self.outcomes.len(),
            succeeded,
            failed: self.outcomes.len() - succeeded,
        }
    }

    /// Successful outcomes in request order
    pub fn successes(&self) -> impl Iterator<Item = &DownloadOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    /// Failed outcomes in request order
    pub fn failures(&self) -> impl Iterator<Item = &DownloadOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// Consume the report, yielding outcomes in request order
    pub fn into_outcomes(self) -> Vec<DownloadOutcome> {
        self.outcomes
    }
}

impl<'a> IntoIterator for &'a BatchReport {
    type Item = &'a DownloadOutcome;
    type IntoIter = std::slice::Iter<'a, DownloadOutcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.iter()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts = self.counts();
        writeln!(f, "Download summary:")?;
        writeln!(f, "  total:     {}", counts.total)?;
        writeln!(f, "  succeeded: {}", counts.succeeded)?;
        write!(f, "  failed:    {}", counts.failed)?;
        for outcome in self.failures() {
            write!(
                f,
                "\n  [{}] {}: {}",
                outcome.status, outcome.source_url, outcome.detail
            )?;
        }
        Ok(())
    }
}

/// Progress event broadcast to subscribers
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A batch has been planned and is about to start
    BatchStarted {
        /// Number of distinct URLs
        total: usize,
    },

    /// A task acquired its concurrency token and is about to issue its first request
    TaskStarted {
        /// Source URL
        url: String,
        /// Position in the batch
        index: usize,
    },

    /// A transient failure occurred and the task is backing off
    Retrying {
        /// Source URL
        url: String,
        /// Zero-based attempt that failed
        attempt: u32,
        /// Delay before the next attempt
        delay: Duration,
        /// Why the attempt failed
        reason: String,
    },

    /// A task reached its terminal status (sent exactly once per task)
    TaskFinished {
        /// The task's outcome
        outcome: DownloadOutcome,
        /// Number of tasks finished so far, including this one
        completed: usize,
        /// Number of tasks in the batch
        total: usize,
    },

    /// Every task of the batch has finished
    BatchFinished {
        /// Aggregate counts
        counts: BatchCounts,
    },
}
