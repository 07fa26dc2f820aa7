//! Batch orchestration split into focused submodules.
//!
//! The `BatchDownloader` struct and its methods are organized by concern:
//! - [`plan`] - URL deduplication, validation and file name reservation
//! - [`batch`] - Running a planned batch and assembling the report
//! - [`task`] - One download, from slot acquisition to terminal outcome
//! - [`lifecycle`] - Releasing shared resources

mod batch;
mod lifecycle;
mod plan;
mod task;


use crate::config::Config;
use crate::error::Result;
use crate::limiter::ConcurrencyLimiter;
use crate::transport::{Transport, TransportPool};
use crate::types::Event;
use crate::validator::ContentValidator;
use crate::writer::FileWriter;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Buffer size of the event channel; lagging subscribers lose the oldest events
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Concurrent batch downloader (cloneable - all shared state is Arc-wrapped)
///
/// Every batch started from the same downloader, or from any of its clones,
/// shares one transport pool and one concurrency limit.
#[derive(Clone)]
pub struct BatchDownloader {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Shared HTTP transport (trait object so tests can script responses)
    pub(crate) transport: Arc<dyn Transport>,
    /// Content type and signature checks
    pub(crate) validator: Arc<ContentValidator>,
    /// Blocking write pool
    pub(crate) writer: FileWriter,
    /// Bounds the number of transfers in flight
    pub(crate) limiter: ConcurrencyLimiter,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Logger the batch runs under instead of the caller's current one
    pub(crate) dispatch: Option<tracing::Dispatch>,
}

impl BatchDownloader {
    /// Create a downloader backed by a pooled HTTP client
    ///
    /// The configuration is validated up front; no connection is opened until
    /// the first request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the configuration is
    /// invalid or a header value cannot be sent.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let transport = Arc::new(TransportPool::new(&config)?);
        Ok(Self::build(config, transport))
    }

    /// Create a downloader over a custom [`Transport`]
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, transport))
    }

    fn build(config: Config, transport: Arc<dyn Transport>) -> Self {
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let writer = FileWriter::new(
            config.effective_write_workers(),
            config.artifact.extension.clone(),
        );

        tracing::debug!(
            max_concurrency = config.max_concurrency,
            write_workers = config.effective_write_workers(),
            max_retries = config.retry.max_retries,
            "Downloader initialized"
        );

        Self {
            validator: Arc::new(ContentValidator::new(&config.artifact)),
            limiter: ConcurrencyLimiter::new(config.max_concurrency),
            config: Arc::new(config),
            transport,
            writer,
            event_tx,
            dispatch: None,
        }
    }

    /// Run every batch under `dispatch` instead of the caller's current logger
    ///
    /// Nothing process-wide is touched, so several downloaders in one process
    /// can log to different places.
    pub fn with_dispatch(mut self, dispatch: tracing::Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    /// Subscribe to progress events
    ///
    /// Each receiver gets every event sent after it subscribed. Events are
    /// dropped silently when nobody is subscribed.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// The validated configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Highest number of transfers that were ever in flight at once
    pub fn peak_concurrency(&self) -> usize {
        self.limiter.peak()
    }

    pub(crate) fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}
