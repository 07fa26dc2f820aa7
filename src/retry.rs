//! Retry logic with exponential backoff
//!
//! Each download runs a small state machine:
//!
//! ```text
//!              ┌──────────── transient, budget left ───────────┐
//!              v                                               │
//! Attempting ──┼── 200 + valid ──────────> Accepted            │
//!              ├── 200 + invalid / 404 ──> Failed(NotFound)    │
//!              ├── 403 ──────────────────> Failed(Forbidden)   │
//!              ├── other status / transport error ──> Backoff ─┘
//!              └── same, last attempt ──> Failed(UnknownError | NetworkError)
//! ```
//!
//! Permanent failures (403, 404, wrong format) skip backoff entirely since
//! retrying cannot change the outcome. Transient failures sleep
//! `min(initial_delay * multiplier^attempt, max_delay)` before the next try.
//!
//! The machine only talks to the [`Transport`] trait and a
//! [`ContentValidator`], so the policy can be exercised without a network.

use crate::config::RetryConfig;
use crate::transport::{HttpResponse, Transport, TransportError};
use crate::types::{DownloadStatus, Event};
use crate::validator::ContentValidator;
use bytes::Bytes;
use rand::Rng;
use std::time::Duration;
use tokio::sync::broadcast;
use url::Url;

/// Classification of a single attempt
#[derive(Debug)]
pub enum Classification {
    /// HTTP 200 and the validator accepted the body
    Accepted(Bytes),
    /// A failure retrying cannot fix
    Permanent {
        /// `Forbidden` or `NotFound`
        status: DownloadStatus,
        /// Human-readable reason
        detail: String,
    },
    /// A failure that may clear up on a later attempt
    Transient {
        /// Status to report if no attempts remain (`UnknownError` or `NetworkError`)
        status: DownloadStatus,
        /// Human-readable reason
        detail: String,
    },
}

/// Classify the result of one GET
pub fn classify(
    result: Result<HttpResponse, TransportError>,
    validator: &ContentValidator,
) -> Classification {
    let response = match result {
        Ok(response) => response,
        // DNS, TLS, connect and timeout failures may all clear up on a later attempt
        Err(e) => {
            return Classification::Transient {
                status: DownloadStatus::NetworkError,
                detail: e.to_string(),
            };
        }
    };

    match response.status {
        200 => match validator.validate(&response) {
            Ok(()) => Classification::Accepted(response.body),
            Err(rejection) => Classification::Permanent {
                status: DownloadStatus::NotFound,
                detail: rejection.to_string(),
            },
        },
        403 => Classification::Permanent {
            status: DownloadStatus::Forbidden,
            detail: "authentication required or access denied (HTTP 403)".to_string(),
        },
        404 => Classification::Permanent {
            status: DownloadStatus::NotFound,
            detail: "file does not exist (HTTP 404)".to_string(),
        },
        other => Classification::Transient {
            status: DownloadStatus::UnknownError,
            detail: format!("HTTP error: {other}"),
        },
    }
}

/// State of one download's retry machine
#[derive(Clone, Debug, PartialEq)]
pub enum RetryState {
    /// About to perform the zero-based `attempt`
    Attempting {
        /// Zero-based attempt number
        attempt: u32,
    },
    /// Waiting before the attempt after `attempt`
    Backoff {
        /// Zero-based attempt that just failed
        attempt: u32,
        /// How long to wait
        delay: Duration,
        /// Why the attempt failed
        last_error: String,
    },
    /// The artifact was accepted
    Accepted {
        /// Number of GETs performed
        attempts: u32,
    },
    /// The download failed for good
    Failed {
        /// Terminal status (never `Success`)
        status: DownloadStatus,
        /// Human-readable reason
        detail: String,
        /// Number of GETs performed
        attempts: u32,
    },
}

impl RetryState {
    /// Whether no further attempts will happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, RetryState::Accepted { .. } | RetryState::Failed { .. })
    }
}

/// Transition out of `Attempting { attempt }` given that attempt's classification
///
/// The accepted body is not part of the state; callers keep it from the
/// classification.
pub fn next_state(
    config: &RetryConfig,
    attempt: u32,
    classification: &Classification,
) -> RetryState {
    let attempts = attempt + 1;
    match classification {
        Classification::Accepted(_) => RetryState::Accepted { attempts },
        Classification::Permanent { status, detail } => RetryState::Failed {
            status: *status,
            detail: detail.clone(),
            attempts,
        },
        Classification::Transient { status, detail } => {
            if attempts >= config.max_retries {
                RetryState::Failed {
                    status: *status,
                    detail: detail.clone(),
                    attempts,
                }
            } else {
                RetryState::Backoff {
                    attempt,
                    delay: backoff_delay(config, attempt),
                    last_error: detail.clone(),
                }
            }
        }
    }
}

/// Delay after the zero-based `attempt` failed
///
/// `min(initial_delay * backoff_multiplier^attempt, max_delay)`; with the
/// default config that is 1s, 2s, 4s, ... capped at 32s.
pub fn backoff_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let factor = config.backoff_multiplier.powi(attempt.min(i32::MAX as u32) as i32);
    let secs = config.initial_delay.as_secs_f64() * factor;
    if !secs.is_finite() || secs >= config.max_delay.as_secs_f64() {
        config.max_delay
    } else {
        Duration::from_secs_f64(secs)
    }
}

/// Final result of a retry run
#[derive(Debug)]
pub enum FetchResult {
    /// The validated body, ready to be written
    Accepted {
        /// Response body
        body: Bytes,
        /// Number of GETs performed
        attempts: u32,
    },
    /// The download failed
    Failed {
        /// Terminal status (never `Success`)
        status: DownloadStatus,
        /// Human-readable reason
        detail: String,
        /// Number of GETs performed
        attempts: u32,
    },
}

/// Drives attempts for one URL through a [`Transport`]
pub struct RetryController<'a> {
    transport: &'a dyn Transport,
    validator: &'a ContentValidator,
    config: &'a RetryConfig,
    events: Option<&'a broadcast::Sender<Event>>,
}

impl<'a> RetryController<'a> {
    /// Create a controller over a shared transport and validator
    pub fn new(
        transport: &'a dyn Transport,
        validator: &'a ContentValidator,
        config: &'a RetryConfig,
    ) -> Self {
        Self {
            transport,
            validator,
            config,
            events: None,
        }
    }

    /// Publish [`Event::Retrying`] on `events` before each backoff
    pub fn with_events(mut self, events: &'a broadcast::Sender<Event>) -> Self {
        self.events = Some(events);
        self
    }

    /// Fetch `url` until it is accepted, fails permanently, or the budget runs out
    pub async fn run(&self, url: &Url) -> FetchResult {
        if self.config.max_retries == 0 {
            return FetchResult::Failed {
                status: DownloadStatus::UnknownError,
                detail: "exceeded maximum retries".to_string(),
                attempts: 0,
            };
        }

        let mut state = RetryState::Attempting { attempt: 0 };
        let mut accepted_body = None;

        loop {
            state = match state {
                RetryState::Attempting { attempt } => {
                    let classification = classify(self.transport.get(url).await, self.validator);
                    let next = next_state(self.config, attempt, &classification);
                    if let Classification::Accepted(body) = classification {
                        accepted_body = Some(body);
                    }
                    next
                }
                RetryState::Backoff {
                    attempt,
                    delay,
                    last_error,
                } => {
                    let delay = if self.config.jitter {
                        add_jitter(delay)
                    } else {
                        delay
                    };

                    tracing::warn!(
                        %url,
                        error = %last_error,
                        attempt = attempt + 1,
                        max_attempts = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Attempt failed, retrying"
                    );
                    if let Some(events) = self.events {
                        events
                            .send(Event::Retrying {
                                url: url.to_string(),
                                attempt,
                                delay,
                                reason: last_error,
                            })
                            .ok();
                    }

                    tokio::time::sleep(delay).await;
                    RetryState::Attempting {
                        attempt: attempt + 1,
                    }
                }
                RetryState::Accepted { attempts } => {
                    if attempts > 1 {
                        tracing::info!(%url, attempts, "Download succeeded after retry");
                    }
                    return match accepted_body.take() {
                        Some(body) => FetchResult::Accepted { body, attempts },
                        None => FetchResult::Failed {
                            status: DownloadStatus::UnknownError,
                            detail: "accepted response without a body".to_string(),
                            attempts,
                        },
                    };
                }
                RetryState::Failed {
                    status,
                    detail,
                    attempts,
                } => {
                    if status.is_retryable() {
                        tracing::error!(
                            %url,
                            error = %detail,
                            attempts,
                            "Download failed after all retry attempts"
                        );
                    } else {
                        tracing::debug!(
                            %url,
                            error = %detail,
                            %status,
                            "Download failed with non-retryable status"
                        );
                    }
                    return FetchResult::Failed {
                        status,
                        detail,
                        attempts,
                    };
                }
            };
        }
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// The actual delay will be between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
