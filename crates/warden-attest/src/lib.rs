//! Warden Attest - Establish trust in a discovered device
//!
//! A device presents its certificate on the `/onboard` endpoint, possibly
//! behind framing bytes. This crate locates and validates the DER certificate,
//! re-encodes it as PEM, and relays it to an attestation authority whose
//! HTTP status decides whether the device is trusted.

pub mod cert;
pub mod error;
pub mod relay;

pub use cert::{encode_pem, extract_certificate_pem, locate_der, parse_certificate};
pub use error::AttestError;
pub use relay::{AttestationClient, AttestationConfig, ONBOARD_PATH};
