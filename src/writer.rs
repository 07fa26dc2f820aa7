//! Destination naming and off-scheduler file persistence
//!
//! File names come from the last path segment of the URL, percent-decoded and
//! stripped of characters that are unsafe in file names. URLs without a usable
//! basename fall back to `document_<hash>` where the hash is taken over the
//! full URL. The configured extension is appended when missing.
//!
//! Writes run on tokio's blocking pool behind a semaphore sized to the
//! configured number of write workers, so disk I/O never stalls the tasks
//! driving network transfers. Each file is written to a temporary sibling and
//! renamed into place, which means the final path either holds a complete
//! artifact or nothing.

use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use url::Url;

/// Longest file name (in bytes) derived from a URL, before the extension
const MAX_STEM_LEN: usize = 200;

/// Number of hex characters of the URL hash used in fallback names
const HASH_NAME_LEN: usize = 16;

/// Maximum number of rename attempts when resolving file name collisions
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Persists validated artifacts on a bounded blocking worker pool
#[derive(Clone, Debug)]
pub struct FileWriter {
    workers: Arc<Semaphore>,
    extension: String,
}

impl FileWriter {
    /// Create a writer running at most `workers` blocking writes at once
    pub fn new(workers: usize, extension: impl Into<String>) -> Self {
        Self {
            workers: Arc::new(Semaphore::new(workers.max(1))),
            extension: extension.into(),
        }
    }

    /// File name for `url` with the configured extension
    pub fn file_name_for(&self, url: &Url) -> String {
        file_name_from_url(url, &self.extension)
    }

    /// Write `body` to `path` atomically on the blocking pool
    ///
    /// Overwrites an existing file at `path`. Returns the written path.
    pub async fn write(&self, path: PathBuf, body: Bytes) -> std::io::Result<PathBuf> {
        let _worker = self
            .workers
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| std::io::Error::other(format!("write pool closed: {e}")))?;

        tokio::task::spawn_blocking(move || {
            persist_atomically(&path, &body)?;
            Ok(path)
        })
        .await
        .map_err(|e| std::io::Error::other(format!("write task failed: {e}")))?
    }

    /// Hold one write worker until the returned permit is dropped
    #[cfg(test)]
    #[allow(clippy::unwrap_used)]
    pub(crate) async fn occupy_worker(&self) -> tokio::sync::OwnedSemaphorePermit {
        self.workers.clone().acquire_owned().await.unwrap()
    }
}

/// Derive a file name from the last path segment of `url`
///
/// # Examples
///
/// ```
/// use artifact_dl::writer::file_name_from_url;
/// use url::Url;
///
/// let url = Url::parse("https://arxiv.org/pdf/2401.00001v2").unwrap();
/// assert_eq!(file_name_from_url(&url, "pdf"), "2401.00001v2.pdf");
///
/// let url = Url::parse("https://example.com/papers/Deep%20Learning.PDF").unwrap();
/// assert_eq!(file_name_from_url(&url, "pdf"), "Deep Learning.PDF");
/// ```
pub fn file_name_from_url(url: &Url, extension: &str) -> String {
    let stem = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            urlencoding::decode(segment)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| segment.to_string())
        })
        .map(|decoded| sanitize(&decoded))
        .filter(|name| !name.is_empty());

    match stem {
        Some(name) => with_extension(name, extension),
        None => fallback_file_name(url, extension),
    }
}

/// Hash-derived name for URLs without a usable basename
pub fn fallback_file_name(url: &Url, extension: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_str().as_bytes());
    let hash = format!("{:x}", hasher.finalize());
    format!("document_{}.{}", &hash[..HASH_NAME_LEN], extension)
}

/// Reserve `name` in `taken`, namespacing it with ` (n)` if already reserved
///
/// Comparison is case-insensitive so the result is also unique on
/// case-insensitive file systems. Returns `None` once every suffix up to
/// ` (9999)` is taken.
pub(crate) fn reserve_unique_name(name: &str, taken: &mut HashSet<String>) -> Option<String> {
    if taken.insert(name.to_lowercase()) {
        return Some(name.to_string());
    }

    let path = Path::new(name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
        .to_string();
    let extension = path.extension().and_then(|e| e.to_str());

    for i in 2..=MAX_RENAME_ATTEMPTS {
        let candidate = match extension {
            Some(ext) => format!("{} ({}).{}", stem, i, ext),
            None => format!("{} ({})", stem, i),
        };
        if taken.insert(candidate.to_lowercase()) {
            return Some(candidate);
        }
    }

    None
}

fn with_extension(name: String, extension: &str) -> String {
    let suffix = format!(".{}", extension.to_ascii_lowercase());
    if name.to_ascii_lowercase().ends_with(&suffix) {
        name
    } else {
        format!("{}.{}", name, extension)
    }
}

fn sanitize(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim_matches(|c: char| c == '.' || c.is_whitespace());

    let mut end = trimmed.len().min(MAX_STEM_LEN);
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    trimmed[..end].to_string()
}

fn persist_atomically(path: &Path, body: &[u8]) -> std::io::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| std::io::Error::other(format!("{} has no parent", path.display())))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".artifact-dl-")
        .suffix(".part")
        .tempfile_in(dir)?;
    tmp.write_all(body)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
