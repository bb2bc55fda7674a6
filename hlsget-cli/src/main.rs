mod progress;
mod prompt;

use std::path::PathBuf;
use std::process;

use clap::Parser;
use hlsget_engine::{
    DownloadError, DownloadOptions, DownloaderConfig, HlsDownloader, QualityPolicy,
    parse_header_spec,
};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "hlsget", version, about = "Download HLS (M3U8) VOD streams to MP4")]
struct Args {
    /// M3U8 playlist URL (master or media playlist)
    url: String,

    /// Output file path; defaults to a name derived from the segment count
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Quality selection: `best`, `worst`, or a resolution substring such
    /// as `720`; prompts interactively when omitted
    #[arg(short, long)]
    quality: Option<String>,

    /// Extra request headers, e.g. "Referer: https://example.com, Origin: https://example.com"
    #[arg(short = 'H', long = "headers")]
    headers: Option<String>,

    /// Number of concurrent segment downloads
    #[arg(short, long, default_value_t = hlsget_engine::config::DEFAULT_WORKERS)]
    workers: usize,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(args).await {
        error!("download failed: {e}");
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_directive = if verbose {
        "hlsget=debug,hlsget_engine=debug"
    } else {
        "hlsget=info,hlsget_engine=info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn run(args: Args) -> Result<(), DownloadError> {
    let mut config = DownloaderConfig::default().with_workers(args.workers);
    if let Some(spec) = &args.headers {
        config = config.with_custom_headers(parse_header_spec(spec));
    }

    let policy = QualityPolicy::from_token(args.quality.as_deref());
    let downloader = HlsDownloader::new(config)?;

    let bar = progress::SegmentProgress::new();
    let output = downloader
        .download(
            &args.url,
            DownloadOptions {
                output: args.output,
                policy,
            },
            &prompt::ConsolePrompt,
            Some(bar.sink()),
        )
        .await;
    bar.finish();

    let output = output?;
    println!("Saved to {}", output.display());
    Ok(())
}
