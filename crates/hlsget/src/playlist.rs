//! Manifest fetching and parsing.
//!
//! Wire-format parsing is delegated to `m3u8-rs`; this module owns the
//! mapping into the domain model and the base-URL rules for resolving
//! relative references.

use std::fmt;

use m3u8_rs::{Playlist, parse_playlist_res};
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use crate::config::DownloaderConfig;
use crate::error::DownloadError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One quality/bitrate rendition referenced by a master playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantStream {
    pub uri: String,
    pub resolution: Option<Resolution>,
    pub bandwidth: u64,
}

/// One media chunk referenced by a media playlist. `index` is the 0-based
/// playback position; it is contiguous and must survive every later stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentEntry {
    pub uri: String,
    pub index: usize,
}

/// A parsed manifest is exactly one of the two shapes.
#[derive(Debug, Clone)]
pub enum Manifest {
    Master(Vec<VariantStream>),
    Media(Vec<SegmentEntry>),
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("manifest contains no variants or segments")]
    Empty,

    #[error("not a recognizable M3U8 manifest: {reason}")]
    InvalidFormat { reason: String },
}

/// Parses manifest text into the domain model.
///
/// A variant entry whose RESOLUTION attribute is absent or malformed is kept
/// with `resolution: None` rather than aborting the parse. I-frame-only
/// renditions are not downloadable variants and are dropped.
pub fn parse_manifest(text: &str) -> Result<Manifest, ManifestError> {
    match parse_playlist_res(text.as_bytes()) {
        Ok(Playlist::MasterPlaylist(master)) => {
            let variants: Vec<VariantStream> = master
                .variants
                .into_iter()
                .filter(|v| !v.is_i_frame && !v.uri.is_empty())
                .map(|v| VariantStream {
                    resolution: v.resolution.and_then(|r| {
                        (r.width > 0 && r.height > 0).then_some(Resolution {
                            width: r.width as u32,
                            height: r.height as u32,
                        })
                    }),
                    bandwidth: v.bandwidth,
                    uri: v.uri,
                })
                .collect();
            if variants.is_empty() {
                return Err(ManifestError::Empty);
            }
            debug!(variants = variants.len(), "parsed master playlist");
            Ok(Manifest::Master(variants))
        }
        Ok(Playlist::MediaPlaylist(media)) => {
            let segments: Vec<SegmentEntry> = media
                .segments
                .into_iter()
                .enumerate()
                .map(|(index, segment)| SegmentEntry {
                    uri: segment.uri,
                    index,
                })
                .collect();
            if segments.is_empty() {
                return Err(ManifestError::Empty);
            }
            debug!(segments = segments.len(), "parsed media playlist");
            Ok(Manifest::Media(segments))
        }
        Err(e) => Err(ManifestError::InvalidFormat {
            reason: format!("{e}"),
        }),
    }
}

/// Fetches manifest text over HTTP with the shared request configuration.
pub async fn fetch_manifest(
    client: &Client,
    config: &DownloaderConfig,
    url: &Url,
) -> Result<String, DownloadError> {
    debug!(url = %url, "fetching manifest");
    let response = client
        .get(url.clone())
        .timeout(config.manifest_timeout)
        .send()
        .await?;
    let status = response.status();
    if !status.is_success() {
        match status.as_u16() {
            403 => warn!(url = %url, "access forbidden (403): the server may require authentication or extra headers"),
            404 => warn!(url = %url, "manifest not found (404): check that the URL is correct"),
            _ => {}
        }
        return Err(DownloadError::http_status(
            status,
            url.as_str(),
            "manifest fetch",
        ));
    }
    Ok(response.text().await?)
}

/// The join base for relative references inside the document at `url`: the
/// URL as requested, with query and fragment stripped. Redirect-final
/// response URLs must not be used here; they may carry query strings or
/// point at a different host entirely.
pub fn base_for(url: &Url) -> Url {
    let mut base = url.clone();
    base.set_query(None);
    base.set_fragment(None);
    base
}

/// Resolves a relative-or-absolute reference against a base URL.
pub fn resolve(base: &Url, reference: &str) -> Result<Url, DownloadError> {
    base.join(reference)
        .map_err(|e| DownloadError::invalid_url(reference, e.to_string()))
}
