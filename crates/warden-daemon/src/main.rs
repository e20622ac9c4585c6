//! Warden Daemon - Main entry point
//!
//! Serves discovery requests from the orchestration runtime: each request
//! names an address range and application type, and is answered with the
//! device records of every matching (and, in secure mode, attested) device.

mod api;
mod config;
mod server;
mod state;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use warden_core::DiscoveryDetails;

#[derive(Parser, Debug)]
#[command(name = "warden")]
#[command(about = "Secure HTTP device discovery handler")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "warden.toml")]
    config: PathBuf,

    /// Bind address for the discovery API
    #[arg(short, long)]
    bind: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Run a single discovery from a details file, print the records and exit
    #[arg(long)]
    details: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Warden v{}", env!("CARGO_PKG_VERSION"));

    let mut config = config::load_config(&args.config)?;
    if let Some(bind) = args.bind {
        config.daemon.bind = bind;
    }

    info!(
        max_concurrency = config.discovery.max_concurrency,
        authority = ?config.attestation.authority_url,
        "Configuration loaded"
    );

    let state = state::AppState::new(config);

    if let Some(path) = args.details {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let details: DiscoveryDetails =
            toml::from_str(&content).context("Failed to parse discovery details")?;

        let report = state.scanner.discover(&details).await?;
        println!("{}", serde_json::to_string_pretty(&report.records())?);
    } else {
        let bind = state.config.daemon.bind.clone();
        server::run(state, &bind).await?;
    }

    Ok(())
}
