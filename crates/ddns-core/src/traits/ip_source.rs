// # IP Source Trait
//
// Defines the interface for discovering the host's current address of one
// family.
//
// ## Implementations
//
// - HTTP echo endpoint (IPv4): `ddns-ip-http` crate
// - Local interface via the `ip` command (IPv6): `ddns-ip-iface` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::IpSource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* IpSource implementation */;
//     let current_ip = source.current().await?;
//     println!("current address: {current_ip}");
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// IP version (v4 or v6)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    /// Whether `ip` belongs to this family
    pub fn matches(&self, ip: &IpAddr) -> bool {
        match self {
            IpVersion::V4 => ip.is_ipv4(),
            IpVersion::V6 => ip.is_ipv6(),
        }
    }
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpVersion::V4 => f.write_str("ip4"),
            IpVersion::V6 => f.write_str("ip6"),
        }
    }
}

/// Trait for IP source implementations
///
/// A source answers one question, once per call: what is the current address
/// of its family? Sources do not cache, poll or retry.
///
/// # Errors
///
/// - `Error::Network`: the lookup went over HTTP and the transport failed
/// - `Error::ExternalCommand`: a local command failed or matched nothing
/// - `Error::IpSource`: the lookup succeeded but returned no usable address
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Get the current IP address
    async fn current(&self) -> crate::Result<IpAddr>;

    /// The address family this source reports
    fn version(&self) -> IpVersion;
}
