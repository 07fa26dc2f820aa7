//! Shared fixtures for unit tests: canned responses, fake transports and
//! small inspection helpers.

use crate::transport::{HttpResponse, Transport, TransportError};
use crate::types::Event;
use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use url::Url;

/// A minimal but well-formed PDF body
pub(crate) const PDF_BODY: &[u8] = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\n%%EOF\n";

pub(crate) fn response(status: u16, content_type: Option<&str>, body: &[u8]) -> HttpResponse {
    let mut headers = HeaderMap::new();
    if let Some(ct) = content_type {
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(ct).unwrap());
    }
    HttpResponse {
        status,
        headers,
        body: Bytes::copy_from_slice(body),
    }
}

pub(crate) fn pdf() -> HttpResponse {
    response(200, Some("application/pdf"), PDF_BODY)
}

pub(crate) fn html() -> HttpResponse {
    response(
        200,
        Some("text/html; charset=utf-8"),
        b"<!DOCTYPE html><html><body>Sign in</body></html>",
    )
}

pub(crate) fn status(code: u16) -> HttpResponse {
    response(code, None, b"")
}

/// Sorted names of the files directly inside `dir`
pub(crate) fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Every event already buffered on `rx`
pub(crate) fn drain_events(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Transport replaying a fixed sequence of results and recording call times
pub(crate) struct ScriptedTransport {
    script: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    calls: Mutex<Vec<Instant>>,
}

impl ScriptedTransport {
    pub(crate) fn new(script: Vec<Result<HttpResponse, TransportError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Time between consecutive calls
    pub(crate) fn gaps(&self) -> Vec<Duration> {
        let calls = self.calls.lock().unwrap();
        calls.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, _url: &Url) -> Result<HttpResponse, TransportError> {
        self.calls.lock().unwrap().push(Instant::now());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Request("script exhausted".to_string())))
    }
}

/// Transport answering per URL path, holding each request open for `latency`
/// and tracking how many requests are in flight at once
pub(crate) struct RoutedTransport {
    routes: HashMap<String, Mutex<VecDeque<HttpResponse>>>,
    latency: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
    completed: AtomicUsize,
}

impl RoutedTransport {
    pub(crate) fn new(latency: Duration) -> Self {
        Self {
            routes: HashMap::new(),
            latency,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    /// Answer requests for `path` with `responses` in order; the last one repeats
    pub(crate) fn route(mut self, path: &str, responses: Vec<HttpResponse>) -> Self {
        self.routes
            .insert(path.to_string(), Mutex::new(responses.into()));
        self
    }

    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests that have returned a response
    pub(crate) fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Transport for RoutedTransport {
    async fn get(&self, url: &Url) -> Result<HttpResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.latency).await;

        let result = match self.routes.get(url.path()) {
            Some(queue) => {
                let mut queue = queue.lock().unwrap();
                let next = if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                };
                next.ok_or_else(|| TransportError::Request("empty route".to_string()))
            }
            None => Ok(status(404)),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
        result
    }
}
