//! Warden Discovery - HTTP discovery of devices on a /24 subnet
//!
//! This crate provides:
//! - Device probing over the `/info` HTTP endpoint
//! - A bounded worker pool with ordered and streaming shapes
//! - The discovery scanner that combines probing with attestation

pub mod pool;
pub mod probe;
pub mod scanner;

pub use probe::{probe_device, ProbeError, ProbeResult, INFO_PATH};
pub use scanner::{DiscoveryScanner, DiscoveryStream, ScannerConfig};
