// # HTTP IP Source
//
// This crate provides an HTTP-based IP source for the DDNS reconciler.
//
// ## Purpose
//
// Discovers the host's *public* IPv4 address, as seen from outside any NAT,
// by asking a plain-text "what is my IP" endpoint. The body is expected to be
// the bare address, optionally followed by a newline.
//
// ## Services
//
// - https://checkip.amazonaws.com (default)
// - https://api.ipify.org
// - https://ifconfig.me/ip
// - https://icanhazip.com

use ddns_core::config::{DEFAULT_HTTP_TIMEOUT_SECS, DiscoveryConfig};
use ddns_core::traits::{IpSource, IpVersion};
use ddns_core::{Error, Result};

use std::net::IpAddr;
use std::time::Duration;

/// HTTP-based IP source
pub struct HttpIpSource {
    /// URL to fetch IP from
    url: String,

    /// IP version the endpoint is expected to report
    version: IpVersion,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpSource {
    /// Create a new HTTP IP source
    ///
    /// # Parameters
    ///
    /// - `url`: URL to fetch IP from (e.g., "https://checkip.amazonaws.com")
    /// - `version`: IP version the endpoint reports
    pub fn new(url: impl Into<String>, version: IpVersion) -> Result<Self> {
        Self::with_timeout(url, version, Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
    }

    /// Create with a custom request timeout
    pub fn with_timeout(
        url: impl Into<String>,
        version: IpVersion,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            version,
            client,
        })
    }

    /// IPv4 source as described by the discovery configuration
    pub fn from_config(config: &DiscoveryConfig) -> Result<Self> {
        Self::with_timeout(
            config.ip4_url.clone(),
            IpVersion::V4,
            Duration::from_secs(config.http_timeout_secs),
        )
    }

    /// URL queried by this source
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the raw response body
    async fn fetch(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::network(format!("Request to {} failed: {}", self.url, e)))?;

        if !response.status().is_success() {
            return Err(Error::network(format!(
                "{} returned HTTP {}",
                self.url,
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| Error::network(format!("Failed to read response: {}", e)))
    }
}

/// Parse an echo-endpoint body into an address of the expected family
pub fn parse_ip_response(body: &str, version: IpVersion) -> Result<IpAddr> {
    let ip_text = body.trim();

    let ip: IpAddr = ip_text
        .parse()
        .map_err(|_| Error::ip_source(format!("Invalid IP address: {:?}", ip_text)))?;

    if !version.matches(&ip) {
        return Err(Error::ip_source(format!(
            "Expected {} address, got: {}",
            version, ip
        )));
    }

    Ok(ip)
}

#[async_trait::async_trait]
impl IpSource for HttpIpSource {
    async fn current(&self) -> Result<IpAddr> {
        let body = self.fetch().await?;
        let ip = parse_ip_response(&body, self.version)?;
        tracing::debug!("{} reported {}", self.url, ip);
        Ok(ip)
    }

    fn version(&self) -> IpVersion {
        self.version
    }
}
