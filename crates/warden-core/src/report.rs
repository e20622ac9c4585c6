//! Aggregated discovery results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::device::{DeviceRecord, ScanOutcome};

/// Devices discovered by one scan, in scan order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryReport {
    /// Number of addresses scanned
    pub scanned: usize,
    /// Matched (and, in secure mode, trusted) devices
    pub devices: Vec<ScanOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl DiscoveryReport {
    /// Build a report from the ordered outcomes of a scan
    pub fn from_outcomes(outcomes: Vec<ScanOutcome>, started_at: DateTime<Utc>) -> Self {
        let scanned = outcomes.len();
        let devices = outcomes
            .into_iter()
            .filter(ScanOutcome::is_discovered)
            .collect();
        Self {
            scanned,
            devices,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Host device records for every discovered device
    pub fn records(&self) -> Vec<DeviceRecord> {
        self.devices.iter().filter_map(ScanOutcome::to_record).collect()
    }

    /// One-line summary numbering devices by scan order
    pub fn summary(&self) -> String {
        if self.devices.is_empty() {
            return "No devices discovered".to_string();
        }
        self.devices
            .iter()
            .enumerate()
            .map(|(i, outcome)| {
                let d = outcome.descriptor.clone().unwrap_or_default();
                format!(
                    "{}: {} - {} - {}@{}",
                    i, outcome.address, d.device, d.application, d.version
                )
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceDescriptor;
    use std::net::Ipv4Addr;

    fn descriptor(device: &str) -> DeviceDescriptor {
        DeviceDescriptor {
            device: device.to_string(),
            application: "sensor".to_string(),
            version: "0.3".to_string(),
        }
    }

    #[test]
    fn test_report_keeps_discovered_in_order() {
        let outcomes = vec![
            ScanOutcome::matched(Ipv4Addr::new(10, 0, 0, 1), descriptor("a")),
            ScanOutcome::unmatched(Ipv4Addr::new(10, 0, 0, 2)),
            ScanOutcome::matched(Ipv4Addr::new(10, 0, 0, 3), descriptor("b")).untrusted(),
            ScanOutcome::matched(Ipv4Addr::new(10, 0, 0, 4), descriptor("c")),
        ];
        let report = DiscoveryReport::from_outcomes(outcomes, Utc::now());

        assert_eq!(report.scanned, 4);
        let ids: Vec<String> = report.records().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["10.0.0.1", "10.0.0.4"]);
        assert_eq!(
            report.summary(),
            "0: 10.0.0.1 - a - sensor@0.3, 1: 10.0.0.4 - c - sensor@0.3"
        );
        assert!(report.finished_at >= report.started_at);
    }

    #[test]
    fn test_empty_summary() {
        let report = DiscoveryReport::from_outcomes(
            vec![ScanOutcome::unmatched(Ipv4Addr::new(10, 0, 0, 1))],
            Utc::now(),
        );
        assert_eq!(report.summary(), "No devices discovered");
        assert!(report.records().is_empty());
    }
}
