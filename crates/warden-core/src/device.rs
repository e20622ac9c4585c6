//! Device types for tracking discovered hardware

use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;

use crate::range::{AddressRange, RangeError};

/// Default HTTP port devices listen on
pub const DEVICE_HTTP_PORT: u16 = 80;

/// Protocol marker property expected by the host runtime
pub const PROTOCOL_PROPERTY: &str = "AKRI_HTTP";
pub const HOST_ENDPOINT_PROPERTY: &str = "HOST_ENDPOINT";
pub const APPLICATION_TYPE_PROPERTY: &str = "APPLICATION_TYPE";
pub const DEVICE_PROPERTY: &str = "DEVICE";
pub const VERSION_PROPERTY: &str = "VERSION";

/// Build the URL of an HTTP endpoint on a device
///
/// The port is omitted when it is the default HTTP port.
pub fn device_endpoint(address: Ipv4Addr, port: u16, path: &str) -> String {
    if port == DEVICE_HTTP_PORT {
        format!("http://{}{}", address, path)
    } else {
        format!("http://{}:{}{}", address, port, path)
    }
}

/// Self-reported device identity returned by the `/info` endpoint
///
/// Decoding is lenient: keys match in any case, unknown keys are ignored,
/// and missing or null fields stay empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceDescriptor {
    /// Device label (e.g., "esp32-s3")
    pub device: String,
    /// Application type the device runs
    pub application: String,
    /// Application version
    pub version: String,
}

impl<'de> Deserialize<'de> for DeviceDescriptor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(DescriptorVisitor)
    }
}

struct DescriptorVisitor;

impl<'de> Visitor<'de> for DescriptorVisitor {
    type Value = DeviceDescriptor;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a device descriptor object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut descriptor = DeviceDescriptor::default();
        while let Some(key) = map.next_key::<String>()? {
            let field = match key.to_lowercase().as_str() {
                "device" => &mut descriptor.device,
                "application" => &mut descriptor.application,
                "version" => &mut descriptor.version,
                _ => {
                    map.next_value::<IgnoredAny>()?;
                    continue;
                }
            };
            if let Some(value) = map.next_value::<Option<String>>()? {
                *field = value;
            }
        }
        Ok(descriptor)
    }
}

/// Result of scanning one address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub address: Ipv4Addr,
    /// Device answered with the expected application type
    pub matched: bool,
    pub descriptor: Option<DeviceDescriptor>,
    /// Attestation verdict; stays true when the scan is not in secure mode
    pub trusted: bool,
}

impl ScanOutcome {
    /// Outcome for an address that did not answer or did not match
    pub fn unmatched(address: Ipv4Addr) -> Self {
        Self {
            address,
            matched: false,
            descriptor: None,
            trusted: false,
        }
    }

    /// Outcome for an address whose descriptor matched
    pub fn matched(address: Ipv4Addr, descriptor: DeviceDescriptor) -> Self {
        Self {
            address,
            matched: true,
            descriptor: Some(descriptor),
            trusted: true,
        }
    }

    /// Mark the device as failing attestation
    pub fn untrusted(mut self) -> Self {
        self.trusted = false;
        self
    }

    /// Whether the outcome belongs in the discovery result set
    pub fn is_discovered(&self) -> bool {
        self.matched && self.trusted
    }

    /// Translate into the host device record format
    ///
    /// Returns `None` for outcomes that are not discovered devices.
    pub fn to_record(&self) -> Option<DeviceRecord> {
        if !self.is_discovered() {
            return None;
        }
        let descriptor = self.descriptor.as_ref()?;
        let host = self.address.to_string();

        let mut properties = BTreeMap::new();
        properties.insert(PROTOCOL_PROPERTY.to_string(), "http".to_string());
        properties.insert(HOST_ENDPOINT_PROPERTY.to_string(), host.clone());
        properties.insert(
            APPLICATION_TYPE_PROPERTY.to_string(),
            descriptor.application.clone(),
        );
        properties.insert(DEVICE_PROPERTY.to_string(), descriptor.device.clone());
        properties.insert(VERSION_PROPERTY.to_string(), descriptor.version.clone());

        Some(DeviceRecord {
            id: host,
            properties,
            mounts: Vec::new(),
            device_specs: Vec::new(),
        })
    }
}

/// Scan request supplied by the host runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryDetails {
    #[serde(rename = "ipStart")]
    pub ip_start: String,
    #[serde(rename = "ipEnd")]
    pub ip_end: String,
    #[serde(rename = "applicationType")]
    pub application_type: String,
    /// Require attestation before reporting a device
    #[serde(default)]
    pub secure: bool,
}

impl DiscoveryDetails {
    /// Validate the requested address range
    pub fn address_range(&self) -> Result<AddressRange, RangeError> {
        AddressRange::parse(&self.ip_start, &self.ip_end)
    }
}

/// Device record handed to the host runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Stable identifier (the device address)
    pub id: String,
    pub properties: BTreeMap<String, String>,
    pub mounts: Vec<Mount>,
    pub device_specs: Vec<DeviceSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mount {
    pub container_path: String,
    pub host_path: String,
    pub read_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSpec {
    pub container_path: String,
    pub host_path: String,
    pub permissions: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sensor() -> DeviceDescriptor {
        DeviceDescriptor {
            device: "esp32".to_string(),
            application: "sensor".to_string(),
            version: "1.2.0".to_string(),
        }
    }

    #[test]
    fn test_device_endpoint() {
        let ip = Ipv4Addr::new(10, 0, 0, 7);
        assert_eq!(device_endpoint(ip, 80, "/info"), "http://10.0.0.7/info");
        assert_eq!(device_endpoint(ip, 8080, "/onboard"), "http://10.0.0.7:8080/onboard");
    }

    #[test]
    fn test_descriptor_decodes_permissively() {
        let descriptor: DeviceDescriptor =
            serde_json::from_str(r#"{"application":"sensor","uptime":42}"#).unwrap();
        assert_eq!(descriptor.application, "sensor");
        assert_eq!(descriptor.device, "");
        assert_eq!(descriptor.version, "");
    }

    #[test]
    fn test_descriptor_keys_ignore_case() {
        let descriptor: DeviceDescriptor =
            serde_json::from_str(r#"{"Device":"esp32","Application":"sensor","Version":"1"}"#)
                .unwrap();
        assert_eq!(
            descriptor,
            DeviceDescriptor {
                device: "esp32".to_string(),
                application: "sensor".to_string(),
                version: "1".to_string(),
            }
        );

        let descriptor: DeviceDescriptor =
            serde_json::from_str(r#"{"APPLICATION":"sensor","version":null}"#).unwrap();
        assert_eq!(descriptor.application, "sensor");
        assert!(descriptor.version.is_empty());

        assert!(serde_json::from_str::<DeviceDescriptor>(r#"["sensor"]"#).is_err());
    }

    #[test]
    fn test_outcome_states() {
        let ip = Ipv4Addr::new(10, 0, 0, 1);
        assert!(!ScanOutcome::unmatched(ip).is_discovered());

        let matched = ScanOutcome::matched(ip, sensor());
        assert!(matched.trusted);
        assert!(matched.is_discovered());

        let demoted = matched.untrusted();
        assert!(demoted.matched);
        assert!(!demoted.is_discovered());
        assert!(demoted.to_record().is_none());
    }

    #[test]
    fn test_to_record() {
        let record = ScanOutcome::matched(Ipv4Addr::new(10, 0, 0, 2), sensor())
            .to_record()
            .unwrap();
        assert_eq!(record.id, "10.0.0.2");
        assert_eq!(record.properties[PROTOCOL_PROPERTY], "http");
        assert_eq!(record.properties[HOST_ENDPOINT_PROPERTY], "10.0.0.2");
        assert_eq!(record.properties[APPLICATION_TYPE_PROPERTY], "sensor");
        assert_eq!(record.properties[DEVICE_PROPERTY], "esp32");
        assert_eq!(record.properties[VERSION_PROPERTY], "1.2.0");
        assert!(record.mounts.is_empty());
        assert!(record.device_specs.is_empty());
    }

    #[test]
    fn test_details_from_toml() {
        let details: DiscoveryDetails = toml::from_str(
            r#"
            ipStart = "192.168.1.10"
            ipEnd = "192.168.1.20"
            applicationType = "camera"
            "#,
        )
        .unwrap();
        assert!(!details.secure);
        assert_eq!(details.address_range().unwrap().len(), 11);
    }
}
