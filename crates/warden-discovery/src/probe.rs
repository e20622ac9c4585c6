//! HTTP `/info` probing for device identification

use std::net::Ipv4Addr;
use std::time::Duration;
use thiserror::Error;
use tracing::trace;
use warden_core::device::device_endpoint;
use warden_core::DeviceDescriptor;

/// Device endpoint serving the JSON descriptor
pub const INFO_PATH: &str = "/info";

/// Probe timeout
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("Error fetching {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Received non-success response from {url}: {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("Error reading response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Error decoding response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ProbeError {
    /// Host did not answer at all (refused, unreachable, timed out)
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Request { .. })
    }
}

/// Classification of one probed address
#[derive(Debug)]
pub enum ProbeResult {
    /// Device answered with the expected application type
    Matched(DeviceDescriptor),
    /// Device answered with a different application type
    Mismatched(DeviceDescriptor),
    Failed(ProbeError),
}

/// Build a client for a single probe
///
/// Idle connections are never kept, so every probe opens a fresh connection.
pub fn probe_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
}

/// Fetch and decode the descriptor served by a device
pub async fn fetch_descriptor(
    address: Ipv4Addr,
    port: u16,
    timeout: Duration,
) -> Result<DeviceDescriptor, ProbeError> {
    let url = device_endpoint(address, port, INFO_PATH);
    let client = probe_client(timeout).map_err(ProbeError::Client)?;

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|source| ProbeError::Request {
            url: url.clone(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(ProbeError::Status { url, status });
    }

    let body = response.bytes().await.map_err(|source| ProbeError::Body {
        url: url.clone(),
        source,
    })?;

    serde_json::from_slice(&body).map_err(|source| ProbeError::Decode { url, source })
}

/// Probe one address and classify it against the expected application type
///
/// With no expected type, any device that answers is a match.
pub async fn probe_device(
    address: Ipv4Addr,
    expected: Option<&str>,
    port: u16,
    timeout: Duration,
) -> ProbeResult {
    match fetch_descriptor(address, port, timeout).await {
        Ok(descriptor) => match expected {
            Some(app) if descriptor.application != app => ProbeResult::Mismatched(descriptor),
            _ => {
                trace!(ip = %address, device = %descriptor.device, "Device answered probe");
                ProbeResult::Matched(descriptor)
            }
        },
        Err(e) => ProbeResult::Failed(e),
    }
}
