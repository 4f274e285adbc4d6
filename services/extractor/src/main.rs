//! Himawari point extractor.
//!
//! Groups the downloaded segment files by observation time, decodes each
//! group with the configured decoder program and writes one CSV row per
//! instant with the target point's value in every band.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use extraction::{scan_groups, CommandDecoder, ExtractionOptions, Extractor};
use himawari_common::RunConfig;
use storage::LocalArtifactStore;

#[derive(Parser, Debug)]
#[command(name = "extractor")]
#[command(about = "Point time series from downloaded Himawari segment files")]
struct Args {
    /// Run configuration (YAML)
    #[arg(short, long, env = "HIMAWARI_CONFIG", default_value = "config/himawari.yaml")]
    config: PathBuf,

    /// Output CSV path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Report values in Celsius (true) or Kelvin (false)
    #[arg(long)]
    celsius: Option<bool>,

    /// Directory holding downloaded artifacts
    #[arg(long, env = "HIMAWARI_DATA_DIR")]
    local_root: Option<PathBuf>,

    /// Log level, used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn apply(&self, config: &mut RunConfig) {
        if let Some(output) = &self.output {
            config.output.path = output.clone();
        }
        if let Some(celsius) = self.celsius {
            config.output.celsius = celsius;
        }
        if let Some(root) = &self.local_root {
            config.storage.local_root = root.clone();
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

    let decoder = CommandDecoder::from_config(&config.decoder)
        .ok_or_else(|| anyhow!("No decoder program configured (decoder.program)"))?;
    let options = ExtractionOptions::from_config(&config)?;

    let local = LocalArtifactStore::open(&config.storage.local_root).with_context(|| {
        format!(
            "Failed to open artifact directory {}",
            config.storage.local_root.display()
        )
    })?;
    let groups = scan_groups(&local, &config.product, options.range)?;

    info!(
        groups = groups.len(),
        bands = options.bands.len(),
        latitude = options.latitude,
        longitude = options.longitude,
        output = %config.output.path.display(),
        "Starting Himawari extraction"
    );

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received shutdown signal");
                cancel.store(true, Ordering::Relaxed);
            }
        });
    }

    let extractor = Extractor::new(decoder, options);
    let (table, summary) = tokio::task::spawn_blocking(move || extractor.run(groups, &cancel))
        .await
        .context("Extraction task failed")?;

    if summary.cancelled {
        warn!(rows = table.len(), "Run cancelled, writing the rows extracted so far");
    }

    table
        .write_to_path(&config.output.path, &config.output.null_marker)
        .with_context(|| format!("Failed to write {}", config.output.path.display()))?;

    info!(
        groups = summary.groups,
        extracted = summary.extracted,
        all_missing = summary.all_missing,
        decode_failed = summary.decode_failed,
        errors = summary.errors,
        rows = table.len(),
        output = %config.output.path.display(),
        "Extraction complete"
    );

    Ok(())
}
