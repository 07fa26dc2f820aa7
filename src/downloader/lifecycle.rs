//! Releasing shared resources.

use super::BatchDownloader;

impl BatchDownloader {
    /// Stop accepting downloads and close the shared transport pool
    ///
    /// Downloads already holding a concurrency slot finish on the connections
    /// they hold. Tasks still waiting for a slot, and every task started
    /// afterwards on this downloader or its clones, end as `UnknownError`
    /// with 0 attempts and no request.
    pub async fn shutdown(&self) {
        self.limiter.close();
        self.transport.close().await;
        tracing::info!(
            peak_concurrency = self.limiter.peak(),
            "Downloader shut down"
        );
    }

    /// Whether [`BatchDownloader::shutdown`] has been called on this
    /// downloader or one of its clones
    pub fn is_shut_down(&self) -> bool {
        self.limiter.is_closed()
    }
}
