//! IPv4 address ranges confined to a single /24 subnet

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("Invalid IPv4 address: {0}")]
    InvalidAddress(String),
    #[error("Start and end addresses must be in the same /24 subnet: {start} - {end}")]
    SubnetMismatch { start: Ipv4Addr, end: Ipv4Addr },
    #[error("Range start {start} is after range end {end}")]
    Reversed { start: Ipv4Addr, end: Ipv4Addr },
    #[error("Invalid range format '{0}', expected <start-ip>-<end-ip>")]
    InvalidFormat(String),
}

/// Inclusive range of addresses sharing the first three octets
///
/// Deserialization goes through [`AddressRange::new`], so a decoded range
/// holds the same invariants as a constructed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RangeBounds")]
pub struct AddressRange {
    start: Ipv4Addr,
    end: Ipv4Addr,
}

/// Unchecked wire form of an [`AddressRange`]
#[derive(Deserialize)]
struct RangeBounds {
    start: Ipv4Addr,
    end: Ipv4Addr,
}

impl TryFrom<RangeBounds> for AddressRange {
    type Error = RangeError;

    fn try_from(bounds: RangeBounds) -> Result<Self, Self::Error> {
        Self::new(bounds.start, bounds.end)
    }
}

impl AddressRange {
    /// Create a range, checking that both ends are in the same /24
    pub fn new(start: Ipv4Addr, end: Ipv4Addr) -> Result<Self, RangeError> {
        let (s, e) = (start.octets(), end.octets());
        if s[..3] != e[..3] {
            return Err(RangeError::SubnetMismatch { start, end });
        }
        if s[3] > e[3] {
            return Err(RangeError::Reversed { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parse a range from two dotted-quad strings
    pub fn parse(start: &str, end: &str) -> Result<Self, RangeError> {
        Self::new(parse_ipv4(start)?, parse_ipv4(end)?)
    }

    pub fn start(&self) -> Ipv4Addr {
        self.start
    }

    pub fn end(&self) -> Ipv4Addr {
        self.end
    }

    /// Number of addresses in the range
    pub fn len(&self) -> usize {
        (self.end.octets()[3] - self.start.octets()[3]) as usize + 1
    }

    /// A valid range always holds at least one address
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Expand into the ordered list of addresses, ascending by last octet
    pub fn expand(&self) -> AddressList {
        let [a, b, c, first] = self.start.octets();
        let last = self.end.octets()[3];
        AddressList(
            (first..=last)
                .map(|d| Ipv4Addr::new(a, b, c, d))
                .collect(),
        )
    }
}

impl FromStr for AddressRange {
    type Err = RangeError;

    /// Parse the `<start-ip>-<end-ip>` form used on the command line
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('-').collect();
        match parts.as_slice() {
            [start, end] => Self::parse(start, end),
            _ => Err(RangeError::InvalidFormat(s.to_string())),
        }
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

fn parse_ipv4(s: &str) -> Result<Ipv4Addr, RangeError> {
    s.trim()
        .parse()
        .map_err(|_| RangeError::InvalidAddress(s.to_string()))
}

/// Ordered, immutable list of addresses to scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressList(Vec<Ipv4Addr>);

impl AddressList {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Ipv4Addr] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Ipv4Addr> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<Ipv4Addr> {
        self.0
    }
}

impl From<AddressRange> for AddressList {
    fn from(range: AddressRange) -> Self {
        range.expand()
    }
}

impl IntoIterator for AddressList {
    type Item = Ipv4Addr;
    type IntoIter = std::vec::IntoIter<Ipv4Addr>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a AddressList {
    type Item = &'a Ipv4Addr;
    type IntoIter = std::slice::Iter<'a, Ipv4Addr>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_inclusive_ascending() {
        let range = AddressRange::parse("10.0.0.1", "10.0.0.3").unwrap();
        let list = range.expand();
        assert_eq!(
            list.as_slice(),
            &[
                Ipv4Addr::new(10, 0, 0, 1),
                Ipv4Addr::new(10, 0, 0, 2),
                Ipv4Addr::new(10, 0, 0, 3),
            ]
        );
        assert_eq!(range.len(), 3);
    }

    #[test]
    fn test_expand_counts_and_order() {
        for (first, last) in [(0u8, 0u8), (5, 9), (0, 255), (254, 255), (100, 200)] {
            let start = Ipv4Addr::new(192, 168, 1, first);
            let end = Ipv4Addr::new(192, 168, 1, last);
            let range = AddressRange::new(start, end).unwrap();
            let list = range.expand();
            assert_eq!(list.len(), (last - first) as usize + 1);
            assert_eq!(list.len(), range.len());
            assert!(list.as_slice().windows(2).all(|w| w[0] < w[1]));
            assert_eq!(list.as_slice()[0].octets()[3], first);
            assert_eq!(list.as_slice()[list.len() - 1].octets()[3], last);
        }
    }

    #[test]
    fn test_single_address_range() {
        let range = AddressRange::parse("172.16.4.20", "172.16.4.20").unwrap();
        assert_eq!(range.expand().into_vec(), vec![Ipv4Addr::new(172, 16, 4, 20)]);
    }

    #[test]
    fn test_subnet_mismatch() {
        for end in ["10.0.1.3", "10.1.0.3", "11.0.0.3"] {
            let err = AddressRange::parse("10.0.0.1", end).unwrap_err();
            assert!(matches!(err, RangeError::SubnetMismatch { .. }), "{end}: {err}");
        }
    }

    #[test]
    fn test_invalid_address() {
        assert_eq!(
            AddressRange::parse("10.0.0", "10.0.0.3").unwrap_err(),
            RangeError::InvalidAddress("10.0.0".to_string())
        );
        assert!(matches!(
            AddressRange::parse("10.0.0.1", "10.0.0.300"),
            Err(RangeError::InvalidAddress(_))
        ));
        assert!(matches!(
            AddressRange::parse("fe80::1", "10.0.0.3"),
            Err(RangeError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_reversed_range() {
        assert!(matches!(
            AddressRange::parse("10.0.0.9", "10.0.0.3"),
            Err(RangeError::Reversed { .. })
        ));
    }

    #[test]
    fn test_from_str() {
        let range: AddressRange = "192.168.0.10-192.168.0.12".parse().unwrap();
        assert_eq!(range.start(), Ipv4Addr::new(192, 168, 0, 10));
        assert_eq!(range.end(), Ipv4Addr::new(192, 168, 0, 12));
        assert_eq!(range.to_string(), "192.168.0.10-192.168.0.12");

        assert!(matches!(
            "192.168.0.10".parse::<AddressRange>(),
            Err(RangeError::InvalidFormat(_))
        ));
        assert!(matches!(
            "1.1.1.1-1.1.1.2-1.1.1.3".parse::<AddressRange>(),
            Err(RangeError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_deserialize_validates() {
        let range: AddressRange =
            serde_json::from_str(r#"{"start":"10.0.0.2","end":"10.0.0.5"}"#).unwrap();
        assert_eq!(range.len(), 4);
        assert_eq!(
            serde_json::from_str::<AddressRange>(&serde_json::to_string(&range).unwrap()).unwrap(),
            range
        );

        for (start, end) in [("10.0.0.9", "10.1.0.1"), ("10.0.0.9", "10.0.0.3")] {
            let json = format!(r#"{{"start":"{start}","end":"{end}"}}"#);
            let err = serde_json::from_str::<AddressRange>(&json).unwrap_err();
            assert!(err.to_string().contains(start), "{json}: {err}");
        }
    }
}
