// # DNS Provider Trait
//
// Defines the interface to a DNS-hosting provider's record API.
//
// ## Implementations
//
// - Cloudflare: `ddns-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::{DnsProvider, DnsRecordSpec, RecordType};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//
//     // Create or patch home.example.com A 1.2.3.4
//     let spec = DnsRecordSpec::new("home.example.com", RecordType::A, "1.2.3.4");
//     provider.update_dns_record(&spec).await?;
//
//     Ok(())
// }
// ```

use crate::record::{DnsRecordSpec, RecordType};
use async_trait::async_trait;
use serde_json::Value;

/// Result of one upsert
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateResult {
    /// No record matched name and type, so one was created
    Created {
        /// Id of the new record, when the provider reported one
        record_id: Option<String>,
        /// Raw provider response
        response: Value,
    },
    /// An existing record was patched in place
    Patched {
        /// Id of the patched record
        record_id: String,
        /// Raw provider response
        response: Value,
    },
}

impl UpdateResult {
    /// Raw provider response
    pub fn response(&self) -> &Value {
        match self {
            UpdateResult::Created { response, .. } | UpdateResult::Patched { response, .. } => {
                response
            }
        }
    }

    /// Whether this upsert created a record
    pub fn is_created(&self) -> bool {
        matches!(self, UpdateResult::Created { .. })
    }
}

/// Trait for DNS provider implementations
///
/// The four primitives map one-to-one onto provider API calls. The upsert
/// [`update_dns_record`](DnsProvider::update_dns_record) is built on top of
/// them and is shared by every provider.
///
/// # Responsibilities
///
/// Providers perform API calls to their own endpoints and translate
/// responses. They do not retry, cache zone or record ids between calls, or
/// decide which records need updating; that belongs to the reconciler.
///
/// HTTP-level failures must surface as errors. A successful response body is
/// handed back untouched.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Resolve the id of the zone named exactly `zone_name`
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The zone id
    /// - `Err(Error::NotFound)`: No zone has that exact name
    /// - `Err(Error)`: The request failed
    async fn get_zone_id(&self, zone_name: &str) -> crate::Result<String>;

    /// Resolve the id of the record matching `name` and `record_type` exactly
    ///
    /// Absence is not an error: `Ok(None)` tells the caller to create the
    /// record instead of patching it.
    async fn get_dns_record_id(
        &self,
        zone_id: &str,
        name: &str,
        record_type: RecordType,
    ) -> crate::Result<Option<String>>;

    /// Overwrite content, TTL and proxy flag of an existing record
    async fn patch_dns_record(
        &self,
        zone_id: &str,
        record_id: &str,
        spec: &DnsRecordSpec,
    ) -> crate::Result<Value>;

    /// Create a new record in the zone
    async fn post_dns_record(&self, zone_id: &str, spec: &DnsRecordSpec) -> crate::Result<Value>;

    /// Create or patch the record described by `spec`
    ///
    /// # Idempotency
    ///
    /// Repeated calls with the same spec converge on a single matching
    /// record: the first call may create it, every later call patches it.
    async fn update_dns_record(&self, spec: &DnsRecordSpec) -> crate::Result<UpdateResult> {
        crate::reconcile::upsert_record(self, spec).await
    }

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Builds a provider client from a credential
///
/// Each configured domain carries its own API token, so the orchestrator asks
/// the factory for a fresh client per config item.
pub trait DnsProviderFactory: Send + Sync {
    /// Create a DnsProvider authenticated with `api_token`
    fn create(&self, api_token: &str) -> crate::Result<Box<dyn DnsProvider>>;
}
