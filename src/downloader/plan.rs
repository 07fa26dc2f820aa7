//! Turning the requested URLs into download tasks.

use crate::error::Error;
use crate::types::{DownloadStatus, DownloadTask};
use crate::writer::{FileWriter, reserve_unique_name};
use std::collections::HashSet;
use std::path::Path;
use url::Url;

/// A requested URL after planning
#[derive(Debug)]
pub(super) enum PlannedTask {
    /// Valid URL with a reserved destination file name
    Ready { task: DownloadTask, url: Url },
    /// URL that fails without a request: unparsable, unsupported scheme, or
    /// no free file name left
    Rejected {
        index: usize,
        source_url: String,
        status: DownloadStatus,
        reason: String,
    },
}

/// Plan one task per distinct URL, in request order
///
/// Repeated URLs are dropped after their first occurrence. File names are
/// reserved in request order, so colliding names get ` (2)`, ` (3)` suffixes
/// deterministically and no two tasks ever target the same path.
pub(super) fn plan_batch<S: AsRef<str>>(
    urls: &[S],
    destination: &Path,
    writer: &FileWriter,
) -> Vec<PlannedTask> {
    let mut seen = HashSet::new();
    let mut taken = HashSet::new();
    let mut planned = Vec::with_capacity(urls.len());

    for raw in urls {
        let raw = raw.as_ref();
        if !seen.insert(raw) {
            tracing::debug!(url = raw, "Ignoring repeated URL");
            continue;
        }

        let entry = plan_one(planned.len(), raw, destination, writer, &mut taken);
        planned.push(entry);
    }

    planned
}

fn plan_one(
    index: usize,
    raw: &str,
    destination: &Path,
    writer: &FileWriter,
    taken: &mut HashSet<String>,
) -> PlannedTask {
    let rejected = |status, reason: String| PlannedTask::Rejected {
        index,
        source_url: raw.to_string(),
        status,
        reason,
    };

    let url = match parse_source_url(raw) {
        Ok(url) => url,
        Err(e) => return rejected(DownloadStatus::NotFound, e.to_string()),
    };

    let wanted = writer.file_name_for(&url);
    match reserve_unique_name(&wanted, taken) {
        Some(file_name) => PlannedTask::Ready {
            task: DownloadTask {
                index,
                source_url: raw.to_string(),
                destination_dir: destination.to_path_buf(),
                file_name,
            },
            url,
        },
        None => rejected(
            DownloadStatus::UnknownError,
            format!("no unique file name available for '{wanted}'"),
        ),
    }
}

/// Parse an absolute http(s) URL
pub(super) fn parse_source_url(raw: &str) -> Result<Url, Error> {
    let url = Url::parse(raw.trim()).map_err(|e| Error::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}
