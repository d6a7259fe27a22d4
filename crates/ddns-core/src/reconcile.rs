//! Record reconciliation
//!
//! Turns desired state into provider calls:
//!
//! 1. [`zone_root`] picks the zone a record lives in
//! 2. [`upsert_record`] looks the record up and patches or creates it
//! 3. [`reconcile_item`] maps one config item and the discovered addresses
//!    onto A/AAAA upserts

use crate::config::DnsConfigItem;
use crate::discovery::DiscoveredIps;
use crate::record::{DnsRecordSpec, RecordType};
use crate::traits::{DnsProvider, UpdateResult};
use crate::Result;
use std::net::IpAddr;
use tracing::debug;

/// Zone root of a fully-qualified record name
///
/// Takes the last two dot-separated labels when the name has at least three,
/// otherwise returns the name unchanged:
///
/// - `"a.b.example.com"` → `"example.com"`
/// - `"example.com"` → `"example.com"`
///
/// Multi-label public suffixes are not recognised: `"home.example.co.uk"`
/// yields `"co.uk"`, which will not match a zone and fails with `NotFound`.
pub fn zone_root(name: &str) -> &str {
    let mut dots = name.rmatch_indices('.').map(|(i, _)| i);
    let (Some(_last), Some(second)) = (dots.next(), dots.next()) else {
        return name;
    };

    let root = &name[second + 1..];
    let prefix = &name[..second];
    let labels_ok = root.split('.').all(|label| !label.is_empty());

    if prefix.is_empty() || !labels_ok {
        name
    } else {
        root
    }
}

/// Create or patch the record described by `spec`
///
/// Resolves the zone from [`zone_root`], looks for a record with the same
/// name and type, then patches it in place or creates it. The lookup makes
/// the operation idempotent: a second call with the same spec finds the
/// record the first call created and patches it.
pub async fn upsert_record<P>(provider: &P, spec: &DnsRecordSpec) -> Result<UpdateResult>
where
    P: DnsProvider + ?Sized,
{
    let zone_name = zone_root(&spec.name);
    debug!(
        "Resolving zone {} for {} ({})",
        zone_name, spec.name, spec.record_type
    );
    let zone_id = provider.get_zone_id(zone_name).await?;

    match provider
        .get_dns_record_id(&zone_id, &spec.name, spec.record_type)
        .await?
    {
        Some(record_id) => {
            debug!("Patching {} ({}) record {}", spec.name, spec.record_type, record_id);
            let response = provider.patch_dns_record(&zone_id, &record_id, spec).await?;
            Ok(UpdateResult::Patched {
                record_id,
                response,
            })
        }
        None => {
            debug!("Creating {} ({})", spec.name, spec.record_type);
            let response = provider.post_dns_record(&zone_id, spec).await?;
            let record_id = response["result"]["id"].as_str().map(str::to_string);
            Ok(UpdateResult::Created {
                record_id,
                response,
            })
        }
    }
}

/// Per-family outcome of reconciling one config item
///
/// A family is `None` when it was skipped: no address was discovered for it,
/// or the item disabled it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemResult {
    /// Outcome of the A record upsert
    pub ip4: Option<UpdateResult>,
    /// Outcome of the AAAA record upsert
    pub ip6: Option<UpdateResult>,
}

impl ItemResult {
    /// Whether no record was touched
    pub fn is_empty(&self) -> bool {
        self.ip4.is_none() && self.ip6.is_none()
    }
}

/// Build the spec for one family of a config item
pub fn record_spec(item: &DnsConfigItem, ip: IpAddr) -> DnsRecordSpec {
    DnsRecordSpec::for_ip(item.name.clone(), ip)
        .with_ttl(item.effective_ttl())
        .with_proxied(item.effective_proxied())
}

/// Reconcile one config item against the discovered addresses
///
/// Upserts the A record when an IPv4 address is present and the item has not
/// disabled it, then the AAAA record under the same rule. The first failure
/// is returned and the remaining family is not attempted.
pub async fn reconcile_item<P>(
    provider: &P,
    item: &DnsConfigItem,
    ips: &DiscoveredIps,
) -> Result<ItemResult>
where
    P: DnsProvider + ?Sized,
{
    let mut result = ItemResult::default();

    if let Some(ip4) = ips.ip4 {
        if item.enabled.ip4 {
            let spec = record_spec(item, IpAddr::V4(ip4));
            result.ip4 = Some(provider.update_dns_record(&spec).await?);
        } else {
            debug!("{} ({}) disabled, skipping", item.name, RecordType::A);
        }
    }

    if let Some(ip6) = ips.ip6 {
        if item.enabled.ip6 {
            let spec = record_spec(item, IpAddr::V6(ip6));
            result.ip6 = Some(provider.update_dns_record(&spec).await?);
        } else {
            debug!("{} ({}) disabled, skipping", item.name, RecordType::Aaaa);
        }
    }

    Ok(result)
}
