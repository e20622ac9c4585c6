//! Attestation failures

use reqwest::StatusCode;
use thiserror::Error;

/// Why a device could not be attested
///
/// Every variant is local to one device: the scan demotes that device to
/// untrusted and carries on with the others.
#[derive(Error, Debug)]
pub enum AttestError {
    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("Failed to fetch {url}: {source}")]
    OnboardFetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Could not locate DER certificate start in onboarding payload")]
    CertificateNotFound,
    #[error("Failed to parse certificate: {0}")]
    CertificateParse(String),
    #[error("No attestation authority configured")]
    AuthorityNotConfigured,
    #[error("Failed to POST certificate to {url}: {source}")]
    RelayTransport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Attestation authority rejected certificate: {status}")]
    RelayRejected { status: StatusCode },
}
