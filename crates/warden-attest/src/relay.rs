//! Relay device certificates to the attestation authority

use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::{debug, info};
use warden_core::device::{device_endpoint, DEVICE_HTTP_PORT};

use crate::cert::extract_certificate_pem;
use crate::error::AttestError;

/// Device endpoint serving the onboarding certificate
pub const ONBOARD_PATH: &str = "/onboard";

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Attestation settings
#[derive(Debug, Clone)]
pub struct AttestationConfig {
    /// Attestation authority URL; secure scans fail every device without it
    pub authority_url: Option<String>,
    /// Port devices serve `/onboard` on
    pub device_port: u16,
    pub timeout: Duration,
}

impl Default for AttestationConfig {
    fn default() -> Self {
        Self {
            authority_url: None,
            device_port: DEVICE_HTTP_PORT,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Single-use attestation client
///
/// Built per device so no connection is shared between scan workers.
pub struct AttestationClient {
    client: reqwest::Client,
    config: AttestationConfig,
}

impl AttestationClient {
    pub fn new(config: AttestationConfig) -> Result<Self, AttestError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(0)
            .no_proxy()
            .build()
            .map_err(AttestError::Client)?;
        Ok(Self { client, config })
    }

    /// Fetch the raw onboarding payload from a device
    pub async fn fetch_onboard(&self, address: Ipv4Addr) -> Result<Vec<u8>, AttestError> {
        let url = device_endpoint(address, self.config.device_port, ONBOARD_PATH);
        let fetch_err = |source| AttestError::OnboardFetch {
            url: url.clone(),
            source,
        };

        let response = self.client.get(&url).send().await.map_err(fetch_err)?;
        if !response.status().is_success() {
            debug!(
                url = %url,
                status = %response.status(),
                "Onboarding endpoint returned non-success status"
            );
        }
        let body = response.bytes().await.map_err(fetch_err)?;
        Ok(body.to_vec())
    }

    /// POST a PEM certificate to the authority; only HTTP 200 is acceptance
    pub async fn submit(&self, pem: &str) -> Result<(), AttestError> {
        let url = self
            .config
            .authority_url
            .as_deref()
            .ok_or(AttestError::AuthorityNotConfigured)?;

        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(pem.to_string())
            .send()
            .await
            .map_err(|source| AttestError::RelayTransport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(AttestError::RelayRejected { status });
        }
        Ok(())
    }

    /// Run the full attestation exchange for one device
    ///
    /// `Ok(true)` means the authority accepted the device certificate.
    pub async fn verify_device(&self, address: Ipv4Addr) -> Result<bool, AttestError> {
        if self.config.authority_url.is_none() {
            return Err(AttestError::AuthorityNotConfigured);
        }

        let payload = self.fetch_onboard(address).await?;
        let pem = extract_certificate_pem(&payload)?;
        debug!(ip = %address, bytes = payload.len(), "Extracted device certificate");

        self.submit(&pem).await?;
        info!(ip = %address, "Device certificate accepted by attestation authority");
        Ok(true)
    }
}
