//! Desired-state DNS record types
//!
//! A [`DnsRecordSpec`] serializes directly into the provider request body
//! (`{name, type, content, ttl, proxied}`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// TTL applied when none is given (seconds)
pub const DEFAULT_TTL: u32 = 120;

/// Proxy flag applied when none is given
pub const DEFAULT_PROXIED: bool = true;

/// DNS record type managed by the updater
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// A record (IPv4)
    A,
    /// AAAA record (IPv6)
    #[serde(rename = "AAAA")]
    Aaaa,
}

impl RecordType {
    /// Wire name of the record type
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }

    /// Record type matching an address family
    pub fn for_ip(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => RecordType::A,
            IpAddr::V6(_) => RecordType::Aaaa,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Desired state of one DNS record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecordSpec {
    /// Fully-qualified record name (e.g. "home.example.com")
    pub name: String,

    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,

    /// Record content (the IP address)
    pub content: String,

    /// Time-to-live in seconds
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Whether traffic is routed through the provider's edge
    #[serde(default = "default_proxied")]
    pub proxied: bool,
}

impl DnsRecordSpec {
    /// Create a spec with the default TTL and proxy flag
    pub fn new(name: impl Into<String>, record_type: RecordType, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            record_type,
            content: content.into(),
            ttl: DEFAULT_TTL,
            proxied: DEFAULT_PROXIED,
        }
    }

    /// Create a spec for an address, picking A or AAAA from its family
    pub fn for_ip(name: impl Into<String>, ip: IpAddr) -> Self {
        Self::new(name, RecordType::for_ip(&ip), ip.to_string())
    }

    /// Set the TTL
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the proxy flag
    pub fn with_proxied(mut self, proxied: bool) -> Self {
        self.proxied = proxied;
        self
    }
}

fn default_ttl() -> u32 {
    DEFAULT_TTL
}

fn default_proxied() -> bool {
    DEFAULT_PROXIED
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_spec_defaults() {
        let spec = DnsRecordSpec::new("home.example.com", RecordType::A, "1.2.3.4");
        assert_eq!(spec.ttl, 120);
        assert!(spec.proxied);
    }

    #[test]
    fn test_spec_wire_body() {
        let spec = DnsRecordSpec::new("home.example.com", RecordType::Aaaa, "2001:db8::1")
            .with_ttl(300)
            .with_proxied(false);

        assert_eq!(
            serde_json::to_value(&spec).unwrap(),
            json!({
                "name": "home.example.com",
                "type": "AAAA",
                "content": "2001:db8::1",
                "ttl": 300,
                "proxied": false,
            })
        );
    }

    #[test]
    fn test_spec_missing_options_use_defaults() {
        let spec: DnsRecordSpec = serde_json::from_value(json!({
            "name": "vpn.example.com",
            "type": "A",
            "content": "10.0.0.1",
        }))
        .unwrap();

        assert_eq!(spec.ttl, DEFAULT_TTL);
        assert_eq!(spec.proxied, DEFAULT_PROXIED);
    }

    #[test]
    fn test_record_type_for_ip() {
        let v4: IpAddr = "1.2.3.4".parse().unwrap();
        let v6: IpAddr = "2001:db8::1".parse().unwrap();
        assert_eq!(DnsRecordSpec::for_ip("a.example.com", v4).record_type, RecordType::A);
        assert_eq!(DnsRecordSpec::for_ip("a.example.com", v6).record_type, RecordType::Aaaa);
        assert_eq!(RecordType::Aaaa.to_string(), "AAAA");
    }
}
