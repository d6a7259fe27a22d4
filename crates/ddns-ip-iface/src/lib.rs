// # Interface IP Source
//
// This crate provides an IPv6 source that reads the global address assigned
// to a local network interface.
//
// ## Implementation
//
// Runs `ip -6 addr show dev <interface>` (iproute2) and picks the first
// `inet6` address that is not link-local (`fe80::/10`) or loopback. The
// prefix length (`/64`) is stripped.
//
// ```text
// 2: enp1s0: <BROADCAST,MULTICAST,UP,LOWER_UP> mtu 1500 state UP qlen 1000
//     inet6 2001:db8::1/64 scope global dynamic mngtmpaddr
//        valid_lft 86367sec preferred_lft 14367sec
//     inet6 fe80::5054:ff:fe12:3456/64 scope link
//        valid_lft forever preferred_lft forever
// ```
//
// ## Platform Support
//
// Requires the iproute2 `ip` binary, so Linux only in practice.

use ddns_core::config::{DEFAULT_IP6_INTERFACE, DiscoveryConfig};
use ddns_core::traits::{IpSource, IpVersion};
use ddns_core::{Error, Result};

use std::net::{IpAddr, Ipv6Addr};
use tokio::process::Command;

/// Program used to list interface addresses
const IP_PROGRAM: &str = "ip";

/// IPv6 source backed by a local interface
#[derive(Debug, Clone)]
pub struct InterfaceIpSource {
    /// Interface to inspect (e.g. "enp1s0")
    interface: String,

    /// Program to run
    program: String,
}

impl InterfaceIpSource {
    /// Create a source for the given interface
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            program: IP_PROGRAM.to_string(),
        }
    }

    /// Source for the interface named in the discovery configuration
    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self::new(config.ip6_interface.clone())
    }

    /// Run a different program in place of `ip`
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Interface inspected by this source
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Run the address listing and return its stdout
    async fn list_addresses(&self) -> Result<String> {
        let output = Command::new(&self.program)
            .args(["-6", "addr", "show", "dev", self.interface.as_str()])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::external_command(format!("Failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(Error::external_command(format!(
                "{} addr show {} exited with {}: {}",
                self.program,
                self.interface,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for InterfaceIpSource {
    fn default() -> Self {
        Self::new(DEFAULT_IP6_INTERFACE)
    }
}

fn is_link_local(ip: &Ipv6Addr) -> bool {
    (ip.segments()[0] & 0xffc0) == 0xfe80
}

/// First global IPv6 address in `ip addr show` output
pub fn parse_global_ipv6(output: &str) -> Option<Ipv6Addr> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            match fields.next() {
                Some("inet6") => fields.next(),
                _ => None,
            }
        })
        .filter_map(|cidr| cidr.split('/').next()?.parse::<Ipv6Addr>().ok())
        .find(|ip| !is_link_local(ip) && !ip.is_loopback())
}

#[async_trait::async_trait]
impl IpSource for InterfaceIpSource {
    async fn current(&self) -> Result<IpAddr> {
        let output = self.list_addresses().await?;

        let ip = parse_global_ipv6(&output).ok_or_else(|| {
            Error::external_command(format!(
                "No global IPv6 address on interface {}",
                self.interface
            ))
        })?;

        tracing::debug!("{} has {}", self.interface, ip);
        Ok(IpAddr::V6(ip))
    }

    fn version(&self) -> IpVersion {
        IpVersion::V6
    }
}
