//! docparse-daemon: document parsing service
//!
//! Provides:
//! - TCP server answering ParsePDF, ParseDOCX and HealthCheck requests
//! - Bounded pool of blocking parse workers

use anyhow::{Context, Result};
use clap::Parser;
use docparse_core::LabelSet;
use docparse_daemon::config::{default_config_path, load_config, Config};
use docparse_daemon::{Server, ServerOptions, VERSION};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "docparse-daemon")]
#[command(about = "Document parsing service - extracts text and metadata from PDF and DOCX")]
#[command(version)]
struct Args {
    /// Config file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address (default 0.0.0.0:50051)
    #[arg(long)]
    listen: Option<String>,

    /// Maximum concurrent parses
    #[arg(long)]
    workers: Option<usize>,

    /// Per-parse deadline in seconds (0 disables)
    #[arg(long)]
    parse_timeout_secs: Option<u64>,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = match args.config.clone() {
        Some(path) => path,
        None => default_config_path()?,
    };
    let config = match load_config(&config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!(
                "Failed to load config from {}: {}. Using defaults.",
                config_path.display(),
                err
            );
            Config::default()
        }
    };

    match args.log_file.clone().or_else(|| config.log_file()) {
        Some(log_path) => init_file_logging(&log_path)?,
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(std::io::stderr)
                .init();
        }
    }

    let listen = args.listen.clone().unwrap_or_else(|| config.listen_addr());
    let options = server_options(&args, &config);

    tracing::info!(
        "docparse-daemon {} starting (pid: {})",
        VERSION,
        std::process::id()
    );

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    rt.block_on(async_main(&listen, options))
}

/// `RUST_LOG` when set, `info` otherwise
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn init_file_logging(log_path: &Path) -> Result<()> {
    if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).context("Failed to create log directory")?;
    }
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("Failed to open log file: {}", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::sync::Mutex::new(log_file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// CLI flags win over the config file
fn server_options(args: &Args, config: &Config) -> ServerOptions {
    let parse_timeout = match args.parse_timeout_secs {
        Some(0) => None,
        Some(secs) => Some(Duration::from_secs(secs)),
        None => config.parse_timeout(),
    };
    ServerOptions {
        workers: args.workers.unwrap_or_else(|| config.workers()).max(1),
        labels: LabelSet::for_locale(config.label_locale()),
        parse_timeout,
    }
}

async fn async_main(listen: &str, options: ServerOptions) -> Result<()> {
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;

    let server = Server::bind(listen, options).await?;

    tokio::select! {
        result = server.run() => {
            result?;
        }
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM, shutting down");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT, shutting down");
        }
    }

    tracing::info!("docparse-daemon stopped");
    Ok(())
}
