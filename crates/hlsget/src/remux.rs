//! Remux orchestration: drives an external ffmpeg process over the
//! materialized segments, preferring a zero-recode stream copy and falling
//! back to a full transcode when the copy attempt fails.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::assemble::AssembledStream;

pub const DEFAULT_FFMPEG_BINARY: &str = "ffmpeg";

/// How ffmpeg should treat the streams. The fallback policy is the order in
/// which modes are attempted, not exception control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemuxMode {
    /// Copy video and audio streams without re-encoding.
    Copy,
    /// Re-encode video (h264) and audio (aac).
    Transcode,
}

impl RemuxMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::Transcode => "transcode",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RemuxError {
    #[error("ffmpeg binary `{binary}` not found; install ffmpeg or set an explicit path")]
    FfmpegNotFound { binary: String },

    #[error("remux failed in both copy and transcode modes: {stderr_tail}")]
    BothAttemptsFailed { stderr_tail: String },

    #[error("I/O error while materializing segments: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

enum StepOutcome {
    Success,
    Failed { stderr_tail: String },
}

pub struct Remuxer {
    binary: String,
    version: Option<String>,
}

impl Remuxer {
    pub fn new() -> Self {
        Self::with_binary(DEFAULT_FFMPEG_BINARY)
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        let binary = binary.into();
        let version = Self::detect_version(&binary);
        match &version {
            Some(version) => debug!(%version, "detected ffmpeg"),
            None => warn!(binary = %binary, "could not detect ffmpeg version"),
        }
        Self { binary, version }
    }

    /// First line of `ffmpeg -version`, probed once at construction.
    fn detect_version(binary: &str) -> Option<String> {
        std::process::Command::new(binary)
            .arg("-version")
            .output()
            .ok()
            .and_then(|output| {
                String::from_utf8(output.stdout)
                    .ok()
                    .and_then(|s| s.lines().next().map(|line| line.to_owned()))
            })
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Output name used when the caller gave none; encodes the segment count.
    pub fn default_output_name(segment_count: usize) -> PathBuf {
        PathBuf::from(format!("downloaded_video_{segment_count}_segments.mp4"))
    }

    /// Pure argument builder, one invocation per mode.
    fn build_args(mode: RemuxMode, concat_list: &Path, output: &Path) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-hide_banner".into(),
            "-y".into(),
            "-f".into(),
            "concat".into(),
            "-safe".into(),
            "0".into(),
            "-i".into(),
            concat_list.to_string_lossy().into_owned(),
        ];
        match mode {
            RemuxMode::Copy => args.extend(["-c".into(), "copy".into()]),
            RemuxMode::Transcode => args.extend([
                "-c:v".into(),
                "libx264".into(),
                "-c:a".into(),
                "aac".into(),
            ]),
        }
        args.extend(["-f".into(), "mp4".into()]);
        args.push(output.to_string_lossy().into_owned());
        args
    }

    /// Writes the payloads as numbered segment files plus the ffmpeg concat
    /// list, all inside the run's scoped working directory.
    async fn materialize(
        stream: &AssembledStream,
        workdir: &Path,
    ) -> Result<PathBuf, RemuxError> {
        let mut entries = String::new();
        for (index, payload) in stream.payloads().iter().enumerate() {
            let path = workdir.join(format!("segment_{index:05}.ts"));
            tokio::fs::write(&path, payload).await?;
            entries.push_str(&format!("file '{}'\n", path.display()));
        }
        let concat_list = workdir.join("concat.txt");
        tokio::fs::write(&concat_list, entries).await?;
        Ok(concat_list)
    }

    async fn run_step(
        &self,
        mode: RemuxMode,
        concat_list: &Path,
        output: &Path,
    ) -> Result<StepOutcome, RemuxError> {
        let args = Self::build_args(mode, concat_list, output);
        debug!(mode = mode.as_str(), ?args, "invoking ffmpeg");
        let result = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;
        match result {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(RemuxError::FfmpegNotFound {
                    binary: self.binary.clone(),
                })
            }
            Err(e) => Err(RemuxError::Io { source: e }),
            Ok(out) if out.status.success() => Ok(StepOutcome::Success),
            Ok(out) => Ok(StepOutcome::Failed {
                stderr_tail: stderr_tail(&out.stderr),
            }),
        }
    }

    /// Remuxes the assembled stream into `output`. Attempts a stream copy
    /// first; a non-zero exit triggers exactly one transcode retry. Only the
    /// final outcome is surfaced.
    pub async fn remux(
        &self,
        stream: &AssembledStream,
        workdir: &Path,
        output: &Path,
    ) -> Result<(), RemuxError> {
        let concat_list = Self::materialize(stream, workdir).await?;
        info!(
            segments = stream.len(),
            bytes = stream.total_bytes(),
            output = %output.display(),
            "remuxing"
        );

        let mut last_failure = String::new();
        for mode in [RemuxMode::Copy, RemuxMode::Transcode] {
            match self.run_step(mode, &concat_list, output).await? {
                StepOutcome::Success => {
                    info!(mode = mode.as_str(), output = %output.display(), "remux complete");
                    return Ok(());
                }
                StepOutcome::Failed { stderr_tail } => {
                    warn!(
                        mode = mode.as_str(),
                        stderr = %stderr_tail,
                        "remux attempt failed"
                    );
                    last_failure = stderr_tail;
                }
            }
        }
        Err(RemuxError::BothAttemptsFailed {
            stderr_tail: last_failure,
        })
    }
}

impl Default for Remuxer {
    fn default() -> Self {
        Self::new()
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let trimmed = text.trim();
    match trimmed.char_indices().nth_back(499) {
        Some((offset, _)) => trimmed[offset..].to_owned(),
        None => trimmed.to_owned(),
    }
}
