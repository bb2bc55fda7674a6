use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect;
use tracing::warn;

use crate::error::DownloadError;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const DEFAULT_WORKERS: usize = 4;

/// Immutable request configuration, built once before any fetch and shared
/// by every request in the run.
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// User agent string
    pub user_agent: String,

    /// Headers applied to every request; custom entries win over defaults.
    pub headers: HeaderMap,

    /// Per-request timeout for manifest fetches
    pub manifest_timeout: Duration,

    /// Per-request timeout for segment fetches
    pub segment_timeout: Duration,

    /// Number of concurrent segment workers, always >= 1
    pub workers: usize,

    /// Whether to follow redirects
    pub follow_redirects: bool,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: DownloaderConfig::get_default_headers(),
            manifest_timeout: Duration::from_secs(30),
            segment_timeout: Duration::from_secs(30),
            workers: DEFAULT_WORKERS,
            follow_redirects: true,
        }
    }
}

impl DownloaderConfig {
    pub fn get_default_headers() -> HeaderMap {
        let mut default_headers = HeaderMap::new();

        default_headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );

        default_headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9"),
        );

        default_headers.insert(
            reqwest::header::CONNECTION,
            HeaderValue::from_static("keep-alive"),
        );

        default_headers
    }

    /// Merge custom headers over the defaults; custom entries take
    /// precedence for the same field.
    pub fn with_custom_headers(mut self, custom: HeaderMap) -> Self {
        for (name, value) in custom.iter() {
            self.headers.insert(name.clone(), value.clone());
        }
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_segment_timeout(mut self, timeout: Duration) -> Self {
        self.segment_timeout = timeout;
        self
    }

    pub fn build_client(&self) -> Result<reqwest::Client, DownloadError> {
        let redirect_policy = if self.follow_redirects {
            redirect::Policy::default()
        } else {
            redirect::Policy::none()
        };

        let client = reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .default_headers(self.headers.clone())
            .redirect(redirect_policy)
            .connect_timeout(Duration::from_secs(30))
            .build()?;
        Ok(client)
    }
}

/// Parses a `"Name: Value, Name: Value"` header specification into a header
/// map. Pairs without a colon and names or values the HTTP layer rejects are
/// skipped with a warning rather than failing the run.
pub fn parse_header_spec(spec: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for pair in spec.split(',') {
        let Some((name, value)) = pair.split_once(':') else {
            if !pair.trim().is_empty() {
                warn!(pair = pair.trim(), "ignoring malformed header pair");
            }
            continue;
        };
        let (name, value) = (name.trim(), value.trim());
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(parsed_name), Ok(parsed_value)) => {
                headers.insert(parsed_name, parsed_value);
            }
            _ => warn!(header = name, "ignoring invalid header"),
        }
    }
    headers
}
