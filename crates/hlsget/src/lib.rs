//! HLS VOD download engine.
//!
//! Resolves an M3U8 manifest (master playlist -> media playlist), selects one
//! variant by policy, fetches all segments with a bounded worker pool while
//! preserving playlist order, and remuxes the result into a single MP4 via an
//! external ffmpeg process (stream copy first, transcode fallback).

pub mod assemble;
pub mod config;
pub mod download;
pub mod error;
pub mod fetch;
pub mod playlist;
pub mod remux;
pub mod select;

pub use assemble::{AssembleError, AssembledStream};
pub use config::{DEFAULT_USER_AGENT, DownloaderConfig, parse_header_spec};
pub use download::{DownloadOptions, HlsDownloader};
pub use error::DownloadError;
pub use fetch::{FailureCause, FetchSummary, ProgressEvent, ProgressSink, SegmentFetcher};
pub use playlist::{Manifest, ManifestError, Resolution, SegmentEntry, VariantStream};
pub use remux::{RemuxError, RemuxMode, Remuxer};
pub use select::{QualityPolicy, SelectError, VariantPrompt};
