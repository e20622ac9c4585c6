//! scan-tool - List every device answering on the `/info` endpoint
//!
//! Scans a range within one /24 and prints devices as they are found.
//! Probe failures are printed only with `--debug`.

use anyhow::Result;
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing::Level;
use warden_core::AddressRange;
use warden_discovery::{DiscoveryScanner, ScannerConfig};

#[derive(Parser, Debug)]
#[command(name = "scan-tool")]
#[command(about = "Scan an IPv4 range for HTTP discoverable devices")]
#[command(version)]
struct Args {
    /// Address range, e.g. 192.168.1.1-192.168.1.254
    range: String,

    /// Print probe diagnostics
    #[arg(long)]
    debug: bool,

    /// Addresses probed at once
    #[arg(short, long, default_value = "50")]
    concurrency: usize,

    /// Per-request timeout in milliseconds
    #[arg(long, default_value = "3000")]
    timeout_ms: u64,

    /// Device HTTP port
    #[arg(short, long, default_value = "80")]
    port: u16,

    /// Only report devices running this application type
    #[arg(short, long)]
    application: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    warden_tools::init_logging(if args.debug { Level::DEBUG } else { Level::WARN })?;

    let range: AddressRange = match args.range.parse() {
        Ok(range) => range,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    println!("Scanning IP range: {} to {}", range.start(), range.end());

    let scanner = DiscoveryScanner::new(ScannerConfig {
        max_concurrency: args.concurrency,
        request_timeout_ms: args.timeout_ms,
        device_port: args.port,
        authority_url: None,
    });
    let mut stream = scanner.stream(range.expand(), args.application.as_deref(), false);

    let mut diagnostics = stream.diagnostics;
    let debug = args.debug;
    let printer = tokio::spawn(async move {
        loop {
            match diagnostics.recv().await {
                Ok(message) if debug => println!("Message: {}", message),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) if debug => {
                    println!("Message: {} diagnostics dropped", skipped)
                }
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut found = 0;
    while let Some(outcome) = stream.discoveries.recv().await {
        let d = outcome.descriptor.unwrap_or_default();
        println!(
            "IP: {}, Discovered device: {}, Application: {}, Version: {}",
            outcome.address, d.device, d.application, d.version
        );
        found += 1;
    }

    let scanned = stream.handle.await?;
    printer.await?;
    println!("Scanned {} addresses, found {} devices", scanned, found);
    Ok(())
}
