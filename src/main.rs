//! Forager - report JPEG files as they finish arriving in a directory.
//!
//! Entry point for the forager binary.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use forager::metrics::init_metrics;
use forager::observability::{init_tracing, TracingConfig};
use forager::sniff::JpegSniffer;
use forager::{Config, Result};
use tokio_util::sync::CancellationToken;

/// Forager - report JPEG files once they stop changing
#[derive(Parser, Debug)]
#[command(name = "forager")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory to scan for new files
    dir: PathBuf,

    /// Milliseconds a file must stay unmodified before it is sniffed
    #[arg(long, env = "FORAGER_INACTIVITY_CUTOFF_MS", default_value = "5000")]
    inactivity_cutoff_ms: u64,

    /// Milliseconds between directory scans
    #[arg(long, env = "FORAGER_SCAN_INTERVAL_MS", default_value = "1000")]
    scan_interval_ms: u64,

    /// Milliseconds between metadata polls of a watched file
    #[arg(long, env = "FORAGER_POLL_INTERVAL_MS", default_value = "1000")]
    poll_interval_ms: u64,

    /// Forget the oldest paths beyond this many remembered files
    #[arg(long, env = "FORAGER_CACHE_CAPACITY")]
    cache_capacity: Option<u64>,

    /// Forget remembered paths after this many seconds
    #[arg(long, env = "FORAGER_CACHE_TTL_SECS")]
    cache_ttl_secs: Option<u64>,

    /// Files the sniffer may hold open at once
    #[arg(long, env = "FORAGER_MAX_OPEN_FILES", default_value = "1")]
    max_open_files: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "FORAGER_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, env = "FORAGER_LOG_JSON")]
    log_json: bool,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Self {
            scan_dir: cli.dir,
            inactivity_cutoff: Duration::from_millis(cli.inactivity_cutoff_ms),
            scan_interval: Duration::from_millis(cli.scan_interval_ms),
            poll_interval: Duration::from_millis(cli.poll_interval_ms),
            log_level: cli.log_level,
            log_json: cli.log_json,
            cache_capacity: cli.cache_capacity,
            cache_ttl: cli.cache_ttl_secs.map(Duration::from_secs),
            max_open_files: cli.max_open_files,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::from(Cli::parse());

    init_tracing(&TracingConfig {
        level: config.log_level.clone(),
        json: config.log_json,
    });

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Forager stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<()> {
    tracing::info!("Forager v{} starting...", env!("CARGO_PKG_VERSION"));
    tracing::debug!(?config, "Configuration loaded");

    config.validate()?;
    init_metrics();

    let sniffer = JpegSniffer::new(config.max_open_files);
    let scanner = config.scanner_builder()?.forager(sniffer.clone()).build()?;

    let token = CancellationToken::new();
    let shutdown = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown requested");
                shutdown.cancel();
            }
            Err(e) => tracing::warn!(error = %e, "Cannot listen for Ctrl-C"),
        }
    });

    let result = scanner.scan_for_files(Some(&token), &config.scan_dir).await;

    // Watchers outlive a failed scan; stop them before exiting.
    token.cancel();
    scanner.wait_for_watchers().await;

    let stats = scanner.stats();
    tracing::info!(
        passes = stats.scan_passes,
        discovered = stats.files_discovered,
        foraged = stats.files_foraged,
        gone = stats.files_gone,
        cancelled = stats.watches_cancelled,
        jpegs = sniffer.jpegs_found(),
        "Scan summary"
    );

    match result {
        Err(e) if e.is_cancelled() => Ok(()),
        other => other,
    }
}
