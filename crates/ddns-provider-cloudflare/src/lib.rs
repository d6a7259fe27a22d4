// # Cloudflare DNS Provider
//
// This crate provides the Cloudflare DNS provider for the DDNS reconciler.
//
// ## Behaviour
//
// - One HTTP request per primitive (zone lookup, record lookup, patch, create)
// - The create-or-patch decision is made by `ddns_core::reconcile`, not here
// - Full error propagation (no retry, no backoff)
// - HTTP timeout configured (30 seconds)
// - Specific error handling for HTTP status codes (401/403, 404, 409, 429, 5xx)
// - Dry-run mode: lookups run, writes are only logged
//
// ## Security Requirements
//
// - API token NEVER appears in logs or `Debug` output
// - Construction fails fast if the token is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?name=...&type=...`
// - Patch DNS Record: PATCH `/zones/:zone_id/dns_records/:record_id`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`

pub mod types;

use async_trait::async_trait;
use ddns_core::traits::{DnsProvider, DnsProviderFactory};
use ddns_core::{DnsRecordSpec, Error, RecordType, Result};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use types::{CloudflareDnsRecord, CloudflareResponse, CloudflareZone};

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const PROVIDER: &str = "cloudflare";

/// Cloudflare DNS provider
///
/// Holds the bearer credential and an HTTP client. Zone and record ids are
/// never cached: every call asks the API.
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform all GET requests (zone lookup, record lookup)
/// - Log the intended PATCH/POST payload
/// - **NOT** modify DNS records
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// API base URL (overridable for testing against a local server)
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: perform GET requests but skip writes
    dry_run: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:DNS:Edit permissions
    /// - `dry_run`: If true, perform GET requests but skip writes
    ///
    /// # Errors
    ///
    /// `Error::Config` if the token is empty or the HTTP client cannot be built.
    pub fn new(api_token: impl Into<String>, dry_run: bool) -> Result<Self> {
        Self::with_base_url(api_token, CLOUDFLARE_API_BASE, dry_run)
    }

    /// Create a provider talking to a different API base URL
    pub fn with_base_url(
        api_token: impl Into<String>,
        base_url: impl Into<String>,
        dry_run: bool,
    ) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.trim().is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            dry_run,
        })
    }

    /// Whether writes are skipped
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach credentials and headers, send, and check the HTTP status
    ///
    /// `context` names the operation in error messages.
    async fn send(&self, request: reqwest::RequestBuilder, context: &str) -> Result<String> {
        let response = request
            .bearer_auth(&self.api_token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| Error::network(format!("{}: HTTP request failed: {}", context, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::network(format!("{}: failed to read response: {}", context, e)))?;

        tracing::debug!("{} -> {}", context, status);
        check_status(status, &body, context)?;
        Ok(body)
    }

    /// GET a list endpoint and unwrap the `result` array
    async fn get_list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        context: &str,
    ) -> Result<Vec<T>> {
        let request = self.client.get(self.url(path)).query(query);
        let body = self.send(request, context).await?;
        parse_list(&body, context)
    }
}

/// Map a non-2xx status to an error
fn check_status(status: StatusCode, body: &str, context: &str) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }

    let detail = api_error_detail(body).unwrap_or_else(|| body.trim().to_string());

    Err(match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "{}: invalid API token or insufficient permissions. Status: {}",
            context, status
        )),
        404 => Error::not_found(format!("{}: {} - {}", context, status, detail)),
        409 => Error::provider(
            PROVIDER,
            format!("{}: conflict: {} - {}", context, status, detail),
        ),
        429 => Error::rate_limited(format!(
            "{}: rate limit exceeded. Status: {}",
            context, status
        )),
        500..=599 => Error::provider(
            PROVIDER,
            format!("{}: server error (transient): {} - {}", context, status, detail),
        ),
        _ => Error::provider(PROVIDER, format!("{}: {} - {}", context, status, detail)),
    })
}

/// First API error message in an error body, if it parses
fn api_error_detail(body: &str) -> Option<String> {
    serde_json::from_str::<CloudflareResponse<Value>>(body)
        .ok()
        .and_then(|response| response.first_error())
}

/// Parse a list response body
fn parse_list<T: DeserializeOwned>(body: &str, context: &str) -> Result<Vec<T>> {
    let response: CloudflareResponse<Vec<T>> = serde_json::from_str(body).map_err(|e| {
        Error::provider(PROVIDER, format!("{}: failed to parse response: {}", context, e))
    })?;

    if !response.success {
        let message = response
            .first_error()
            .unwrap_or_else(|| "unknown error".to_string());
        return Err(Error::provider(PROVIDER, format!("{}: {}", context, message)));
    }

    response.result.ok_or_else(|| {
        Error::provider(
            PROVIDER,
            format!("{}: invalid response format: result is missing", context),
        )
    })
}

/// Id of the zone named exactly `name`
fn select_zone_id(zones: &[CloudflareZone], name: &str) -> Option<String> {
    zones
        .iter()
        .find(|zone| zone.name.eq_ignore_ascii_case(name))
        .map(|zone| zone.id.clone())
}

/// Id of the record matching `name` and `record_type` exactly
fn select_record_id(
    records: &[CloudflareDnsRecord],
    name: &str,
    record_type: RecordType,
) -> Option<String> {
    records
        .iter()
        .find(|record| {
            record.name.eq_ignore_ascii_case(name) && record.record_type == record_type.as_str()
        })
        .map(|record| record.id.clone())
}

/// Parse a write response body, keeping non-JSON bodies as a string
fn raw_response(body: String) -> Value {
    serde_json::from_str(&body).unwrap_or(Value::String(body))
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// ```http
    /// GET /zones?name=example.com
    /// Authorization: Bearer <token>
    /// ```
    async fn get_zone_id(&self, zone_name: &str) -> Result<String> {
        tracing::debug!("Looking up zone ID for: {}", zone_name);

        let zones: Vec<CloudflareZone> = self
            .get_list("/zones", &[("name", zone_name)], "Zone lookup")
            .await?;

        let zone_id = select_zone_id(&zones, zone_name)
            .ok_or_else(|| Error::not_found(format!("Zone not found: {}", zone_name)))?;

        tracing::debug!("Found zone ID: {}", zone_id);
        Ok(zone_id)
    }

    /// ```http
    /// GET /zones/:zone_id/dns_records?name=home.example.com&type=A
    /// Authorization: Bearer <token>
    /// ```
    async fn get_dns_record_id(
        &self,
        zone_id: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<Option<String>> {
        tracing::debug!("Looking up record ID: {} (type: {})", name, record_type);

        let records: Vec<CloudflareDnsRecord> = self
            .get_list(
                &format!("/zones/{}/dns_records", zone_id),
                &[("name", name), ("type", record_type.as_str())],
                "Record lookup",
            )
            .await?;

        let record_id = select_record_id(&records, name, record_type);
        match &record_id {
            Some(id) => tracing::debug!("Found record ID: {}", id),
            None => tracing::debug!("No {} record for {}", record_type, name),
        }
        Ok(record_id)
    }

    /// ```http
    /// PATCH /zones/:zone_id/dns_records/:record_id
    /// {"name": ..., "type": "A", "content": "1.2.3.4", "ttl": 120, "proxied": true}
    /// ```
    async fn patch_dns_record(
        &self,
        zone_id: &str,
        record_id: &str,
        spec: &DnsRecordSpec,
    ) -> Result<Value> {
        let path = format!("/zones/{}/dns_records/{}", zone_id, record_id);

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send PATCH {} with payload: {}",
                path,
                json!(spec)
            );
            return Ok(json!({"success": true, "dry_run": true, "result": {"id": record_id}}));
        }

        tracing::info!(
            "Patching {} ({}) -> {}",
            spec.name,
            spec.record_type,
            spec.content
        );
        let request = self.client.patch(self.url(&path)).body(serde_json::to_vec(spec)?);
        let body = self.send(request, "Record patch").await?;
        Ok(raw_response(body))
    }

    /// ```http
    /// POST /zones/:zone_id/dns_records
    /// {"name": ..., "type": "A", "content": "1.2.3.4", "ttl": 120, "proxied": true}
    /// ```
    async fn post_dns_record(&self, zone_id: &str, spec: &DnsRecordSpec) -> Result<Value> {
        let path = format!("/zones/{}/dns_records", zone_id);

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send POST {} with payload: {}",
                path,
                json!(spec)
            );
            return Ok(json!({"success": true, "dry_run": true, "result": null}));
        }

        tracing::info!(
            "Creating {} ({}) -> {}",
            spec.name,
            spec.record_type,
            spec.content
        );
        let request = self.client.post(self.url(&path)).body(serde_json::to_vec(spec)?);
        let body = self.send(request, "Record create").await?;
        Ok(raw_response(body))
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Factory for creating Cloudflare providers, one per API token
#[derive(Debug, Clone)]
pub struct CloudflareFactory {
    base_url: String,
    dry_run: bool,
}

impl CloudflareFactory {
    /// Factory for the public Cloudflare API in live mode
    pub fn new() -> Self {
        Self {
            base_url: CLOUDFLARE_API_BASE.to_string(),
            dry_run: false,
        }
    }

    /// Use a different API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Enable or disable dry-run mode for every provider built
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        if dry_run {
            tracing::warn!("Cloudflare provider running in DRY-RUN mode - no changes will be made");
        }
        self.dry_run = dry_run;
        self
    }
}

impl Default for CloudflareFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl DnsProviderFactory for CloudflareFactory {
    fn create(&self, api_token: &str) -> Result<Box<dyn DnsProvider>> {
        Ok(Box::new(CloudflareProvider::with_base_url(
            api_token,
            self.base_url.clone(),
            self.dry_run,
        )?))
    }
}
