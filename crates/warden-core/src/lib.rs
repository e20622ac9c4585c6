//! Warden Core - Core types for secure HTTP device discovery
//!
//! This crate provides the foundational types for the Warden system:
//! - IPv4 address ranges restricted to a single /24 and their expansion
//! - Device descriptors and per-address scan outcomes
//! - Discovery reports and the host device record format

pub mod device;
pub mod range;
pub mod report;

pub use device::{
    device_endpoint, DeviceDescriptor, DeviceRecord, DeviceSpec, DiscoveryDetails, Mount,
    ScanOutcome,
};
pub use range::{AddressList, AddressRange, RangeError};
pub use report::DiscoveryReport;
