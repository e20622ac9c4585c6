//! verify-tool - Run device attestation against one device

use anyhow::Result;
use clap::Parser;
use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::Level;
use warden_attest::{AttestationClient, AttestationConfig};

#[derive(Parser, Debug)]
#[command(name = "verify-tool")]
#[command(about = "Relay a device certificate to an attestation authority")]
#[command(version)]
struct Args {
    /// Device address
    device_ip: Ipv4Addr,

    /// Attestation authority URL
    authority_url: String,

    /// Device HTTP port
    #[arg(short, long, default_value = "80")]
    port: u16,

    /// Per-request timeout in milliseconds
    #[arg(long, default_value = "3000")]
    timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    warden_tools::init_logging(args.log_level)?;

    let client = AttestationClient::new(AttestationConfig {
        authority_url: Some(args.authority_url),
        device_port: args.port,
        timeout: Duration::from_millis(args.timeout_ms),
    })?;

    match client.verify_device(args.device_ip).await {
        Ok(true) => println!("Device verified successfully."),
        Ok(false) => println!("Device verification failed."),
        Err(e) => {
            println!("Error verifying device: {}", e);
            std::process::exit(1);
        }
    }
    Ok(())
}
