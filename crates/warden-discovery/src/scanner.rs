//! Discovery scanner that combines probing and attestation

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};
use warden_attest::{AttestError, AttestationClient, AttestationConfig};
use warden_core::device::DEVICE_HTTP_PORT;
use warden_core::{AddressList, DiscoveryDetails, DiscoveryReport, RangeError, ScanOutcome};

use crate::pool::{for_each_limit, map_limit};
use crate::probe::{probe_device, ProbeResult, DEFAULT_PROBE_TIMEOUT};

/// Diagnostics kept for a lagging stream consumer before the oldest are dropped
const DIAGNOSTIC_CAPACITY: usize = 256;

/// Scanner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Maximum number of addresses probed at once
    pub max_concurrency: usize,
    /// Timeout for each HTTP request in milliseconds
    pub request_timeout_ms: u64,
    /// Port devices serve `/info` and `/onboard` on
    pub device_port: u16,
    /// Attestation authority URL used by secure scans
    pub authority_url: Option<String>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 10,
            request_timeout_ms: DEFAULT_PROBE_TIMEOUT.as_millis() as u64,
            device_port: DEVICE_HTTP_PORT,
            authority_url: None,
        }
    }
}

impl ScannerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    fn attestation(&self) -> AttestationConfig {
        AttestationConfig {
            authority_url: self.authority_url.clone(),
            device_port: self.device_port,
            timeout: self.request_timeout(),
        }
    }
}

/// Incremental results of a streaming scan
///
/// `discoveries` is bounded: workers wait for room, so it must be drained.
/// Dropping it lets the scan finish without reporting. `diagnostics` never
/// holds workers up; a slow reader loses the oldest messages.
pub struct DiscoveryStream {
    pub discoveries: mpsc::Receiver<ScanOutcome>,
    pub diagnostics: broadcast::Receiver<String>,
    /// Resolves to the number of scanned addresses
    pub handle: JoinHandle<usize>,
}

/// Parameters shared by every worker of one scan
struct ScanContext {
    expected: Option<String>,
    secure: bool,
    port: u16,
    timeout: Duration,
    attestation: AttestationConfig,
    diagnostics: Option<broadcast::Sender<String>>,
}

impl ScanContext {
    fn diagnose(&self, message: String) {
        if let Some(tx) = &self.diagnostics {
            // No subscribers is fine
            let _ = tx.send(message);
        }
    }

    async fn scan_address(&self, address: Ipv4Addr) -> ScanOutcome {
        let descriptor =
            match probe_device(address, self.expected.as_deref(), self.port, self.timeout).await {
                ProbeResult::Matched(descriptor) => descriptor,
                ProbeResult::Mismatched(descriptor) => {
                    debug!(
                        ip = %address,
                        application = %descriptor.application,
                        "Device does not match expected application type"
                    );
                    self.diagnose(format!(
                        "Device {} does not match expected application type: {}",
                        address, descriptor.application
                    ));
                    return ScanOutcome::unmatched(address);
                }
                ProbeResult::Failed(e) => {
                    if e.is_unreachable() {
                        trace!(ip = %address, error = %e, "No device answered");
                    } else {
                        debug!(ip = %address, error = %e, "Probe failed");
                    }
                    self.diagnose(e.to_string());
                    return ScanOutcome::unmatched(address);
                }
            };

        let outcome = ScanOutcome::matched(address, descriptor);
        if !self.secure {
            info!(ip = %address, descriptor = ?outcome.descriptor, "Discovered device");
            return outcome;
        }

        match self.attest(address).await {
            Ok(true) => {
                info!(ip = %address, descriptor = ?outcome.descriptor, "Discovered trusted device");
                outcome
            }
            Ok(false) => {
                info!(ip = %address, "Device is not trusted");
                self.diagnose(format!("Device {} is not trusted", address));
                outcome.untrusted()
            }
            Err(e) => {
                warn!(ip = %address, error = %e, "Error verifying device");
                self.diagnose(format!("Error verifying device {}: {}", address, e));
                outcome.untrusted()
            }
        }
    }

    async fn attest(&self, address: Ipv4Addr) -> Result<bool, AttestError> {
        AttestationClient::new(self.attestation.clone())?
            .verify_device(address)
            .await
    }
}

/// Discovery scanner service
pub struct DiscoveryScanner {
    config: ScannerConfig,
}

impl DiscoveryScanner {
    /// Create a new scanner with the given configuration
    pub fn new(config: ScannerConfig) -> Self {
        if config.authority_url.is_none() {
            debug!("No attestation authority configured, secure scans will report no devices");
        }
        Self { config }
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    fn context(
        &self,
        expected: Option<&str>,
        secure: bool,
        diagnostics: Option<broadcast::Sender<String>>,
    ) -> Arc<ScanContext> {
        Arc::new(ScanContext {
            expected: expected.map(str::to_string),
            secure,
            port: self.config.device_port,
            timeout: self.config.request_timeout(),
            attestation: self.config.attestation(),
            diagnostics,
        })
    }

    /// Scan every address and return one outcome per address, in input order
    pub async fn scan(
        &self,
        addresses: &AddressList,
        expected: Option<&str>,
        secure: bool,
    ) -> Vec<ScanOutcome> {
        let ctx = self.context(expected, secure, None);
        let slots = map_limit(
            addresses.as_slice().to_vec(),
            self.config.max_concurrency,
            move |address| {
                let ctx = ctx.clone();
                async move { ctx.scan_address(address).await }
            },
        )
        .await;

        // A cancelled probe counts as an address nothing answered on
        slots
            .into_iter()
            .zip(addresses.iter())
            .map(|(slot, &address)| slot.unwrap_or_else(|| ScanOutcome::unmatched(address)))
            .collect()
    }

    /// Run the discovery requested by the host
    ///
    /// Only an invalid address range fails; every per-device problem is
    /// absorbed into the report.
    pub async fn discover(
        &self,
        details: &DiscoveryDetails,
    ) -> Result<DiscoveryReport, RangeError> {
        info!(
            start = %details.ip_start,
            end = %details.ip_end,
            application = %details.application_type,
            secure = details.secure,
            "Discovery requested"
        );

        let range = details.address_range().inspect_err(|e| {
            error!(error = %e, "Invalid discovery address range");
        })?;

        let started_at = Utc::now();
        let outcomes = self
            .scan(&range.expand(), Some(details.application_type.as_str()), details.secure)
            .await;
        let report = DiscoveryReport::from_outcomes(outcomes, started_at);

        info!(
            scanned = report.scanned,
            found = report.devices.len(),
            "Discovered devices: {}",
            report.summary()
        );
        Ok(report)
    }

    /// Scan in the background, reporting devices and diagnostics as they occur
    ///
    /// Devices arrive in completion order, not address order. Must be called
    /// within a Tokio runtime.
    pub fn stream(
        &self,
        addresses: AddressList,
        expected: Option<&str>,
        secure: bool,
    ) -> DiscoveryStream {
        let limit = self.config.max_concurrency.max(1);
        let (device_tx, discoveries) = mpsc::channel(limit);
        let (diagnostic_tx, diagnostics) = broadcast::channel(DIAGNOSTIC_CAPACITY);
        let ctx = self.context(expected, secure, Some(diagnostic_tx));

        let handle = tokio::spawn(async move {
            let count = addresses.len();
            for_each_limit(addresses.into_vec(), limit, move |address| {
                let ctx = ctx.clone();
                let device_tx = device_tx.clone();
                async move {
                    let outcome = ctx.scan_address(address).await;
                    if outcome.is_discovered() && device_tx.send(outcome).await.is_err() {
                        trace!(ip = %address, "Discovery receiver dropped");
                    }
                }
            })
            .await;
            debug!(scanned = count, "Streaming scan complete");
            count
        });

        DiscoveryStream {
            discoveries,
            diagnostics,
            handle,
        }
    }
}
