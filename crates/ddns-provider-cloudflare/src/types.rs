//! Cloudflare API v4 response types

use serde::Deserialize;

/// Response envelope shared by every endpoint
#[derive(Debug, Deserialize)]
pub struct CloudflareResponse<T> {
    pub success: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub errors: Vec<CloudflareApiError>,
}

impl<T> CloudflareResponse<T> {
    /// First error message reported by the API, if any
    pub fn first_error(&self) -> Option<String> {
        self.errors
            .first()
            .map(|e| format!("{} (code {})", e.message, e.code))
    }
}

#[derive(Debug, Deserialize)]
pub struct CloudflareApiError {
    pub code: i64,
    pub message: String,
}

/// Zone as returned by `GET /zones`
#[derive(Debug, Deserialize)]
pub struct CloudflareZone {
    pub id: String,
    pub name: String,
}

/// DNS record as returned by `GET /zones/:zone_id/dns_records`
#[derive(Debug, Deserialize)]
pub struct CloudflareDnsRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
}
