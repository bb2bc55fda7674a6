//! Concurrent segment acquisition.
//!
//! A bounded pool of workers drains a shared queue of segment URLs. Every
//! segment gets exactly one fetch attempt and exactly one recorded result;
//! failures are data, not control flow, so a bad segment never aborts its
//! siblings. Completion order is irrelevant downstream because results are
//! keyed by the segment's playlist index.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use reqwest::{Client, StatusCode};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, trace, warn};
use url::Url;

use crate::config::DownloaderConfig;
use crate::error::DownloadError;
use crate::playlist::{self, SegmentEntry};

/// Why a single segment fetch failed. Stored in the result map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    Timeout,
    Connection,
    HttpStatus(StatusCode),
}

impl std::fmt::Display for FailureCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "request timed out"),
            Self::Connection => write!(f, "connection error"),
            Self::HttpStatus(status) => write!(f, "HTTP {status}"),
        }
    }
}

pub type SegmentResult = Result<Bytes, FailureCause>;

/// Emitted once per completed fetch, success or failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub completed: usize,
    pub total: usize,
}

pub type ProgressSink = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// One result per segment index, plus the expected total.
#[derive(Debug)]
pub struct FetchSummary {
    pub results: BTreeMap<usize, SegmentResult>,
    pub total: usize,
}

impl FetchSummary {
    pub fn failed(&self) -> usize {
        self.results.values().filter(|r| r.is_err()).count()
    }
}

pub struct SegmentFetcher {
    client: Client,
    config: Arc<DownloaderConfig>,
}

impl SegmentFetcher {
    pub fn new(client: Client, config: Arc<DownloaderConfig>) -> Self {
        Self { client, config }
    }

    /// Fetches every segment, distributing work across `config.workers`
    /// concurrent workers pulling from a shared queue. Always returns one
    /// result per index; individual failures never abort the pool.
    pub async fn fetch_all(
        &self,
        base: &Url,
        segments: &[SegmentEntry],
        progress: Option<ProgressSink>,
    ) -> Result<FetchSummary, DownloadError> {
        let total = segments.len();

        // Resolve up front so a malformed URI is a fatal error before any
        // network traffic, and workers share an immutable URL list.
        let mut resolved = Vec::with_capacity(total);
        for segment in segments {
            resolved.push(playlist::resolve(base, &segment.uri)?);
        }
        let queue: Arc<Vec<Url>> = Arc::new(resolved);
        let cursor = Arc::new(AtomicUsize::new(0));
        let workers = self.config.workers.clamp(1, total.max(1));
        let (tx, mut rx) = mpsc::channel::<(usize, SegmentResult)>(workers);

        debug!(total, workers, "starting segment pool");
        let mut pool = JoinSet::new();
        for worker in 0..workers {
            let queue = Arc::clone(&queue);
            let cursor = Arc::clone(&cursor);
            let tx = tx.clone();
            let client = self.client.clone();
            let timeout = self.config.segment_timeout;
            pool.spawn(async move {
                loop {
                    // Claim the next unclaimed index; claims are disjoint,
                    // so no segment is fetched twice or skipped.
                    let index = cursor.fetch_add(1, Ordering::Relaxed);
                    let Some(url) = queue.get(index) else { break };
                    trace!(worker, index, url = %url, "fetching segment");
                    let result = fetch_one(&client, url, timeout).await;
                    if tx.send((index, result)).await.is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);

        let mut results = BTreeMap::new();
        let mut completed = 0usize;
        while let Some((index, result)) = rx.recv().await {
            if let Err(cause) = &result {
                warn!(index, %cause, "segment download failed");
            }
            results.insert(index, result);
            completed += 1;
            if let Some(sink) = &progress {
                sink(ProgressEvent { completed, total });
            }
        }
        while let Some(joined) = pool.join_next().await {
            joined.map_err(std::io::Error::other)?;
        }

        let summary = FetchSummary { results, total };
        debug!(total, failed = summary.failed(), "segment pool drained");
        Ok(summary)
    }
}

async fn fetch_one(client: &Client, url: &Url, timeout: Duration) -> SegmentResult {
    let response = match client.get(url.clone()).timeout(timeout).send().await {
        Ok(response) => response,
        Err(e) => return Err(classify(e)),
    };
    if !response.status().is_success() {
        return Err(FailureCause::HttpStatus(response.status()));
    }
    response.bytes().await.map_err(classify)
}

fn classify(error: reqwest::Error) -> FailureCause {
    if error.is_timeout() {
        FailureCause::Timeout
    } else if let Some(status) = error.status() {
        FailureCause::HttpStatus(status)
    } else {
        // Connect failures and mid-body transport errors land here.
        FailureCause::Connection
    }
}
