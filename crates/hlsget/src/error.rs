use reqwest::StatusCode;

use crate::assemble::AssembleError;
use crate::playlist::ManifestError;
use crate::remux::RemuxError;
use crate::select::SelectError;

/// Top-level error for a download run. Stage-specific errors convert into
/// this via `#[from]`; per-segment fetch failures do not appear here, they
/// travel as data in the result map until the assembly boundary.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("invalid URL `{input}`: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("HTTP request failed: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    #[error("request failed with HTTP {status} during {operation} for {url}")]
    HttpStatus {
        status: StatusCode,
        url: String,
        operation: &'static str,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("variant selection failed: {source}")]
    Select {
        #[from]
        source: SelectError,
    },

    #[error("{failed} of {total} segments failed to download")]
    PartialDownload { failed: usize, total: usize },

    #[error(transparent)]
    Assemble(#[from] AssembleError),

    #[error(transparent)]
    Remux(#[from] RemuxError),
}

impl DownloadError {
    pub fn invalid_url(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn http_status(
        status: StatusCode,
        url: impl Into<String>,
        operation: &'static str,
    ) -> Self {
        Self::HttpStatus {
            status,
            url: url.into(),
            operation,
        }
    }
}
