//! Configuration types for the DDNS system
//!
//! This module defines all configuration structures used throughout the crate.

use crate::record::{DEFAULT_PROXIED, DEFAULT_TTL};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default IPv4 echo endpoint
pub const DEFAULT_IP4_URL: &str = "https://checkip.amazonaws.com";

/// Default interface inspected for the IPv6 address
pub const DEFAULT_IP6_INTERFACE: &str = "enp1s0";

/// Default timeout for the IPv4 echo request, in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Main DDNS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// Domains to reconcile, processed in order
    pub records: Vec<DnsConfigItem>,

    /// Address discovery settings
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Log discovered addresses and per-item results at info level
    #[serde(default)]
    pub debug: bool,
}

impl DdnsConfig {
    /// Create a configuration for the given records with default discovery
    pub fn new(records: Vec<DnsConfigItem>) -> Self {
        Self {
            records,
            discovery: DiscoveryConfig::default(),
            debug: false,
        }
    }

    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            crate::Error::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&contents)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.records.is_empty() {
            return Err(crate::Error::config("No records configured"));
        }

        for item in &self.records {
            item.validate()?;
        }

        self.discovery.validate()?;

        Ok(())
    }
}

/// One domain's update configuration
///
/// The credential travels with the item: different domains may live in
/// different provider accounts.
#[derive(Clone, Serialize, Deserialize)]
pub struct DnsConfigItem {
    /// Provider API token for this domain
    pub api_token: String,

    /// Fully-qualified record name (e.g. "home.example.com")
    pub name: String,

    /// Which record types to maintain
    #[serde(flatten)]
    pub enabled: RecordTypeEnabled,

    /// TTL override (defaults to 120 seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,

    /// Proxy flag override (defaults to true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxied: Option<bool>,
}

// Keep the token out of logs.
impl std::fmt::Debug for DnsConfigItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsConfigItem")
            .field("api_token", &"<REDACTED>")
            .field("name", &self.name)
            .field("enabled", &self.enabled)
            .field("ttl", &self.ttl)
            .field("proxied", &self.proxied)
            .finish()
    }
}

impl DnsConfigItem {
    /// Create an item with both record types enabled
    pub fn new(api_token: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            name: name.into(),
            enabled: RecordTypeEnabled::default(),
            ttl: None,
            proxied: None,
        }
    }

    /// Enable or disable the A record
    pub fn with_ip4(mut self, enabled: bool) -> Self {
        self.enabled.ip4 = enabled;
        self
    }

    /// Enable or disable the AAAA record
    pub fn with_ip6(mut self, enabled: bool) -> Self {
        self.enabled.ip6 = enabled;
        self
    }

    /// Set the TTL
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Set the proxy flag
    pub fn with_proxied(mut self, proxied: bool) -> Self {
        self.proxied = Some(proxied);
        self
    }

    /// TTL to apply, falling back to the default
    pub fn effective_ttl(&self) -> u32 {
        self.ttl.unwrap_or(DEFAULT_TTL)
    }

    /// Proxy flag to apply, falling back to the default
    pub fn effective_proxied(&self) -> bool {
        self.proxied.unwrap_or(DEFAULT_PROXIED)
    }

    /// Validate the item
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.api_token.trim().is_empty() {
            return Err(crate::Error::config(format!(
                "API token for {} cannot be empty",
                self.name
            )));
        }

        validate_domain_name(&self.name)?;

        if self.ttl == Some(0) {
            return Err(crate::Error::config(format!(
                "TTL for {} must be > 0",
                self.name
            )));
        }

        Ok(())
    }
}

/// Which address families a config item maintains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordTypeEnabled {
    /// Maintain the A record
    #[serde(default = "default_enabled")]
    pub ip4: bool,

    /// Maintain the AAAA record
    #[serde(default = "default_enabled")]
    pub ip6: bool,
}

impl Default for RecordTypeEnabled {
    fn default() -> Self {
        Self {
            ip4: true,
            ip6: true,
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// Address discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Plain-text endpoint echoing the caller's public IPv4
    #[serde(default = "default_ip4_url")]
    pub ip4_url: String,

    /// Interface whose global IPv6 address is published
    #[serde(default = "default_ip6_interface")]
    pub ip6_interface: String,

    /// Timeout for the echo request (in seconds)
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl DiscoveryConfig {
    /// Validate the discovery configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.ip4_url.is_empty() {
            return Err(crate::Error::config("IPv4 echo URL cannot be empty"));
        }
        if !self.ip4_url.starts_with("https://") && !self.ip4_url.starts_with("http://") {
            return Err(crate::Error::config(format!(
                "IPv4 echo URL must use HTTP or HTTPS scheme. Got: {}",
                self.ip4_url
            )));
        }
        if self.ip6_interface.trim().is_empty() {
            return Err(crate::Error::config("IPv6 interface cannot be empty"));
        }
        if self.http_timeout_secs == 0 {
            return Err(crate::Error::config("HTTP timeout must be > 0"));
        }
        Ok(())
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            ip4_url: default_ip4_url(),
            ip6_interface: default_ip6_interface(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

fn default_ip4_url() -> String {
    DEFAULT_IP4_URL.to_string()
}

fn default_ip6_interface() -> String {
    DEFAULT_IP6_INTERFACE.to_string()
}

fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

/// Validate that a string is a valid domain name
///
/// Basic RFC 1035 checks: total length, label length, label characters.
pub fn validate_domain_name(domain: &str) -> Result<(), crate::Error> {
    if domain.is_empty() {
        return Err(crate::Error::config("Domain name cannot be empty"));
    }

    if domain.len() > 253 {
        return Err(crate::Error::config(format!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        )));
    }

    for label in domain.split('.') {
        if label.is_empty() {
            return Err(crate::Error::config(format!(
                "Domain name has empty label: '{}'",
                domain
            )));
        }

        if label.len() > 63 {
            return Err(crate::Error::config(format!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        // '*' is allowed for wildcard records
        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '*')
        {
            return Err(crate::Error::config(format!(
                "Domain label contains invalid characters. Label: '{}'",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(crate::Error::config(format!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_item_defaults_from_json() {
        let config = DdnsConfig::from_json(
            r#"{"records": [{"api_token": "T", "name": "home.example.com"}]}"#,
        )
        .unwrap();

        let item = &config.records[0];
        assert!(item.enabled.ip4);
        assert!(item.enabled.ip6);
        assert_eq!(item.effective_ttl(), 120);
        assert!(item.effective_proxied());
        assert_eq!(config.discovery.ip4_url, DEFAULT_IP4_URL);
        assert_eq!(config.discovery.ip6_interface, DEFAULT_IP6_INTERFACE);
        assert_eq!(config.discovery.http_timeout_secs, DEFAULT_HTTP_TIMEOUT_SECS);
        assert!(!config.debug);
    }

    #[test]
    fn test_item_flags_from_json() {
        let config = DdnsConfig::from_json(
            r#"{
                "records": [
                    {"api_token": "T", "name": "a.example.com", "ip6": false, "ttl": 300, "proxied": false}
                ],
                "discovery": {"ip6_interface": "eth0"},
                "debug": true
            }"#,
        )
        .unwrap();

        let item = &config.records[0];
        assert!(item.enabled.ip4);
        assert!(!item.enabled.ip6);
        assert_eq!(item.effective_ttl(), 300);
        assert!(!item.effective_proxied());
        assert_eq!(config.discovery.ip6_interface, "eth0");
        assert!(config.debug);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"records": [{{"api_token": "T", "name": "vpn.example.com"}}]}}"#
        )
        .unwrap();

        let config = DdnsConfig::from_file(file.path()).unwrap();
        assert_eq!(config.records.len(), 1);
        assert_eq!(config.records[0].name, "vpn.example.com");
    }

    #[test]
    fn test_from_missing_file() {
        let err = DdnsConfig::from_file("/nonexistent/ddns.json").unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn test_validate_rejects_empty_records() {
        assert!(DdnsConfig::new(Vec::new()).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_token() {
        let config = DdnsConfig::new(vec![DnsConfigItem::new("  ", "home.example.com")]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_all_families_disabled() {
        let item = DnsConfigItem::new("T", "home.example.com")
            .with_ip4(false)
            .with_ip6(false);
        assert!(DdnsConfig::new(vec![item]).validate().is_ok());
    }

    #[test]
    fn test_validate_accepts_minimal() {
        let config = DdnsConfig::new(vec![DnsConfigItem::new("T", "home.example.com")]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_discovery() {
        let mut config = DdnsConfig::new(vec![DnsConfigItem::new("T", "home.example.com")]);
        config.discovery.ip4_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());

        config.discovery = DiscoveryConfig::default();
        config.discovery.http_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_domain_name_validation() {
        assert!(validate_domain_name("example.com").is_ok());
        assert!(validate_domain_name("*.example.com").is_ok());
        assert!(validate_domain_name("").is_err());
        assert!(validate_domain_name("a..example.com").is_err());
        assert!(validate_domain_name("-a.example.com").is_err());
        assert!(validate_domain_name("a b.example.com").is_err());
        assert!(validate_domain_name(&format!("{}.com", "a".repeat(64))).is_err());
    }

    #[test]
    fn test_debug_redacts_token() {
        let item = DnsConfigItem::new("secret_token_12345", "home.example.com");
        let debug_str = format!("{:?}", item);
        assert!(!debug_str.contains("secret_token_12345"));
        assert!(debug_str.contains("home.example.com"));
    }
}
