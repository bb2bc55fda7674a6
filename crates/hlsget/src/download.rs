//! End-to-end VOD download pipeline.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use reqwest::Client;
use tempfile::TempDir;
use tracing::{debug, info, warn};
use url::Url;

use crate::assemble;
use crate::config::DownloaderConfig;
use crate::error::DownloadError;
use crate::fetch::{ProgressSink, SegmentFetcher};
use crate::playlist::{self, Manifest, ManifestError, SegmentEntry};
use crate::remux::Remuxer;
use crate::select::{self, QualityPolicy, VariantPrompt};

#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Output file path; `None` synthesizes a name from the segment count.
    pub output: Option<PathBuf>,
    pub policy: QualityPolicy,
}

pub struct HlsDownloader {
    config: Arc<DownloaderConfig>,
    client: Client,
    remuxer: Remuxer,
}

impl HlsDownloader {
    pub fn new(config: DownloaderConfig) -> Result<Self, DownloadError> {
        Self::with_remuxer(config, Remuxer::new())
    }

    pub fn with_remuxer(config: DownloaderConfig, remuxer: Remuxer) -> Result<Self, DownloadError> {
        let client = config.build_client()?;
        Ok(Self {
            config: Arc::new(config),
            client,
            remuxer,
        })
    }

    /// Runs the whole pipeline: manifest resolution, variant selection,
    /// segment pool, ordered assembly, remux. Returns the output path.
    ///
    /// The scoped working directory is created before any network work and
    /// removed when this function returns, on every exit path.
    pub async fn download(
        &self,
        url: &str,
        options: DownloadOptions,
        prompt: &dyn VariantPrompt,
        progress: Option<ProgressSink>,
    ) -> Result<PathBuf, DownloadError> {
        let started = Instant::now();
        let workdir = TempDir::with_prefix("hlsget_")?;

        let requested =
            Url::parse(url).map_err(|e| DownloadError::invalid_url(url, e.to_string()))?;
        let (segments, segment_base) = self
            .resolve_segments(&requested, &options.policy, prompt)
            .await?;

        info!(
            segments = segments.len(),
            workers = self.config.workers,
            "downloading segments"
        );
        let fetcher = SegmentFetcher::new(self.client.clone(), Arc::clone(&self.config));
        let summary = fetcher.fetch_all(&segment_base, &segments, progress).await?;
        let failed = summary.failed();
        if failed > 0 {
            warn!(
                failed,
                total = summary.total,
                "segment downloads failed, refusing assembly"
            );
            return Err(DownloadError::PartialDownload {
                failed,
                total: summary.total,
            });
        }

        let stream = assemble::assemble(summary)?;
        let output = options
            .output
            .unwrap_or_else(|| Remuxer::default_output_name(stream.len()));
        self.remuxer.remux(&stream, workdir.path(), &output).await?;

        info!(
            output = %output.display(),
            elapsed = ?started.elapsed(),
            "download complete"
        );
        Ok(output)
    }

    /// Resolves the manifest down to a segment list and the base URL those
    /// segments resolve against, following one master -> media indirection
    /// when present.
    async fn resolve_segments(
        &self,
        requested: &Url,
        policy: &QualityPolicy,
        prompt: &dyn VariantPrompt,
    ) -> Result<(Vec<SegmentEntry>, Url), DownloadError> {
        info!(url = %requested, "fetching manifest");
        let text = playlist::fetch_manifest(&self.client, &self.config, requested).await?;
        match playlist::parse_manifest(&text)? {
            Manifest::Media(segments) => Ok((segments, playlist::base_for(requested))),
            Manifest::Master(variants) => {
                info!(variants = variants.len(), "master playlist detected");
                let chosen = select::select_variant(&variants, policy, prompt).await?;
                if let Some(resolution) = chosen.resolution {
                    info!(%resolution, bandwidth = chosen.bandwidth, "selected variant");
                }
                // Resolve against the requested master URL, stripped of
                // query and fragment; never against a redirect-final URL.
                let media_url = playlist::resolve(&playlist::base_for(requested), &chosen.uri)?;
                debug!(url = %media_url, "fetching media playlist");
                let media_text =
                    playlist::fetch_manifest(&self.client, &self.config, &media_url).await?;
                match playlist::parse_manifest(&media_text)? {
                    Manifest::Media(segments) => {
                        Ok((segments, playlist::base_for(&media_url)))
                    }
                    Manifest::Master(_) => Err(ManifestError::InvalidFormat {
                        reason: "variant reference resolved to another master playlist".to_owned(),
                    }
                    .into()),
                }
            }
        }
    }
}
