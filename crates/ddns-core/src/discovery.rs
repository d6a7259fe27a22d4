//! Address discovery
//!
//! [`IpDiscoverer`] asks one [`IpSource`] per family for the current address
//! and bundles the answers into [`DiscoveredIps`]. A family whose source
//! fails is reported absent, with its error kept alongside, so the other
//! family can still be reconciled; the run only aborts when nothing at all
//! was discovered.

use crate::traits::{IpSource, IpVersion};
use crate::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tracing::{debug, warn};

/// Addresses discovered for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveredIps {
    /// Public IPv4 address
    pub ip4: Option<Ipv4Addr>,
    /// Global IPv6 address
    pub ip6: Option<Ipv6Addr>,
    /// Why IPv4 discovery failed, if its source returned an error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip4_error: Option<String>,
    /// Why IPv6 discovery failed, if its source returned an error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip6_error: Option<String>,
}

impl DiscoveredIps {
    /// Bundle both families
    pub fn new(ip4: Option<Ipv4Addr>, ip6: Option<Ipv6Addr>) -> Self {
        Self {
            ip4,
            ip6,
            ..Self::default()
        }
    }

    /// Record a discovery failure for one family
    pub fn with_error(mut self, version: IpVersion, message: impl Into<String>) -> Self {
        match version {
            IpVersion::V4 => self.ip4_error = Some(message.into()),
            IpVersion::V6 => self.ip6_error = Some(message.into()),
        }
        self
    }

    /// Whether no family was discovered
    pub fn is_empty(&self) -> bool {
        self.ip4.is_none() && self.ip6.is_none()
    }

    /// Discovery error for one family
    ///
    /// `None` when the family was discovered or has no source configured.
    pub fn error(&self, version: IpVersion) -> Option<&str> {
        match version {
            IpVersion::V4 => self.ip4_error.as_deref(),
            IpVersion::V6 => self.ip6_error.as_deref(),
        }
    }
}

impl fmt::Display for DiscoveredIps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |ip: Option<String>| ip.unwrap_or_else(|| "-".to_string());
        write!(
            f,
            "ip4={} ip6={}",
            show(self.ip4.map(|ip| ip.to_string())),
            show(self.ip6.map(|ip| ip.to_string()))
        )
    }
}

/// Discovers the current address of each configured family
#[derive(Default)]
pub struct IpDiscoverer {
    ip4: Option<Box<dyn IpSource>>,
    ip6: Option<Box<dyn IpSource>>,
}

impl IpDiscoverer {
    /// Create a discoverer with no sources
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the IPv4 source
    ///
    /// Fails with `InvalidInput` if the source reports another family.
    pub fn with_ip4_source(mut self, source: Box<dyn IpSource>) -> Result<Self> {
        self.ip4 = Some(check_version(source, IpVersion::V4)?);
        Ok(self)
    }

    /// Set the IPv6 source
    ///
    /// Fails with `InvalidInput` if the source reports another family.
    pub fn with_ip6_source(mut self, source: Box<dyn IpSource>) -> Result<Self> {
        self.ip6 = Some(check_version(source, IpVersion::V6)?);
        Ok(self)
    }

    /// Current IPv4 address
    pub async fn ip4(&self) -> Result<Ipv4Addr> {
        match query(self.ip4.as_deref(), IpVersion::V4).await? {
            IpAddr::V4(ip) => Ok(ip),
            IpAddr::V6(ip) => Err(Error::ip_source(format!("Expected IPv4, got: {}", ip))),
        }
    }

    /// Current IPv6 address
    pub async fn ip6(&self) -> Result<Ipv6Addr> {
        match query(self.ip6.as_deref(), IpVersion::V6).await? {
            IpAddr::V6(ip) => Ok(ip),
            IpAddr::V4(ip) => Err(Error::ip_source(format!("Expected IPv6, got: {}", ip))),
        }
    }

    /// Discover both families, IPv4 first
    ///
    /// A family without a source is left absent and carries no error.
    ///
    /// # Returns
    ///
    /// - `Ok(DiscoveredIps)`: at least one family was discovered
    /// - `Err(Error::NoAddress)`: every family failed or had no source
    pub async fn discover(&self) -> Result<DiscoveredIps> {
        let mut ips = DiscoveredIps::default();

        if self.ip4.is_some() {
            match self.ip4().await {
                Ok(ip) => ips.ip4 = Some(ip),
                Err(e) => {
                    warn!("IPv4 discovery failed: {}", e);
                    ips = ips.with_error(IpVersion::V4, e.to_string());
                }
            }
        }

        if self.ip6.is_some() {
            match self.ip6().await {
                Ok(ip) => ips.ip6 = Some(ip),
                Err(e) => {
                    warn!("IPv6 discovery failed: {}", e);
                    ips = ips.with_error(IpVersion::V6, e.to_string());
                }
            }
        }

        if ips.is_empty() {
            let failures: Vec<String> = [IpVersion::V4, IpVersion::V6]
                .into_iter()
                .filter_map(|v| ips.error(v).map(|e| format!("{}: {}", v, e)))
                .collect();
            return Err(Error::no_address(if failures.is_empty() {
                "No IP source configured".to_string()
            } else {
                failures.join("; ")
            }));
        }

        debug!("Discovered {}", ips);
        Ok(ips)
    }
}

fn check_version(source: Box<dyn IpSource>, expected: IpVersion) -> Result<Box<dyn IpSource>> {
    if source.version() != expected {
        return Err(Error::invalid_input(format!(
            "{} source configured for {}",
            source.version(),
            expected
        )));
    }
    Ok(source)
}

async fn query(source: Option<&dyn IpSource>, version: IpVersion) -> Result<IpAddr> {
    let source =
        source.ok_or_else(|| Error::ip_source(format!("No {} source configured", version)))?;
    source.current().await
}
