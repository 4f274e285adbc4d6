//! Himawari segment downloader.
//!
//! Enumerates every (date, time, band, segment) key of the configured period
//! and fetches the ones not yet on disk. Safe to re-run: existing artifacts
//! are skipped and interrupted transfers never leave a final file behind.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use acquisition::{FetchConfig, Fetcher, KeySpace};
use himawari_common::{Band, RunConfig, Segment};
use storage::{LocalArtifactStore, RemoteStore};

/// Keys logged by `--dry-run`.
const DRY_RUN_PREVIEW: usize = 10;

#[derive(Parser, Debug)]
#[command(name = "downloader")]
#[command(about = "Resumable bulk downloader for Himawari segment files")]
struct Args {
    /// Run configuration (YAML)
    #[arg(short, long, env = "HIMAWARI_CONFIG", default_value = "config/himawari.yaml")]
    config: PathBuf,

    /// First day to fetch (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last day to fetch, inclusive
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Bands to fetch, e.g. B14,B15
    #[arg(long, value_delimiter = ',')]
    bands: Vec<Band>,

    /// Segments to fetch, e.g. 4,5
    #[arg(long, value_delimiter = ',')]
    segments: Vec<Segment>,

    /// Directory for downloaded artifacts
    #[arg(long, env = "HIMAWARI_DATA_DIR")]
    local_root: Option<PathBuf>,

    /// Maximum concurrent downloads
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// Log the key space without fetching anything
    #[arg(long)]
    dry_run: bool,

    /// Log level, used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn apply(&self, config: &mut RunConfig) {
        if let Some(start) = self.start {
            config.period.start = start;
        }
        if let Some(end) = self.end {
            config.period.end = end;
        }
        if !self.bands.is_empty() {
            config.bands = self.bands.clone();
        }
        if !self.segments.is_empty() {
            config.segments = self.segments.clone();
        }
        if let Some(root) = &self.local_root {
            config.storage.local_root = root.clone();
        }
        if let Some(n) = self.max_concurrent {
            config.remote.max_concurrent = n;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .init();

    let mut config = RunConfig::load(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    args.apply(&mut config);
    config.validate().context("Invalid run configuration")?;

    let space = KeySpace::from_config(&config)?;
    info!(
        start = %config.period.start,
        end = %config.period.end,
        days = space.days(),
        bands = space.bands().len(),
        segments = space.segments().len(),
        keys = space.len(),
        "Starting Himawari downloader"
    );

    if args.dry_run {
        for key in space.iter().take(DRY_RUN_PREVIEW) {
            info!(path = %key.remote_path(&config.product), "Planned key");
        }
        return Ok(());
    }

    let remote = RemoteStore::new(&config.remote).context("Failed to create remote client")?;
    let local = LocalArtifactStore::open(&config.storage.local_root).with_context(|| {
        format!(
            "Failed to open artifact directory {}",
            config.storage.local_root.display()
        )
    })?;

    let fetcher = Fetcher::new(
        Arc::new(remote),
        local,
        config.product.clone(),
        FetchConfig::from(&config.remote),
    );

    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received shutdown signal"),
            Err(e) => {
                warn!(error = %e, "Cannot listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        }
    };

    let summary = fetcher.run_until(space.iter(), shutdown).await;
    info!(
        fetched = summary.fetched,
        skipped = summary.skipped,
        absent = summary.absent,
        failed = summary.failed,
        total_bytes = summary.bytes,
        cancelled = summary.cancelled,
        "Download session complete"
    );

    Ok(())
}
