//! Contract Test: Address Family Gating
//!
//! Verifies which record types `reconcile_item` touches.
//!
//! Constraints verified:
//! - A family disabled on the item is never submitted
//! - A family with no discovered address is never submitted
//! - The A record is reconciled before the AAAA record
//! - Item TTL and proxy overrides reach the provider

mod common;

use common::*;
use ddns_core::{reconcile_item, DiscoveredIps, DnsConfigItem, RecordType};

fn both_families() -> DiscoveredIps {
    DiscoveredIps::new(
        Some("1.2.3.4".parse().unwrap()),
        Some("2001:db8::1".parse().unwrap()),
    )
}

fn created_types(provider: &FakeProvider) -> Vec<RecordType> {
    provider
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::Create { spec, .. } => Some(spec.record_type),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn disabled_ip6_issues_no_aaaa_update() {
    let provider = FakeProvider::new().with_zone("example.com", "Z1");
    let item = DnsConfigItem::new("T", "home.example.com").with_ip6(false);

    let result = reconcile_item(&provider, &item, &both_families())
        .await
        .unwrap();

    assert!(result.ip4.is_some());
    assert!(result.ip6.is_none());
    assert_eq!(created_types(&provider), vec![RecordType::A]);
}

#[tokio::test]
async fn disabled_ip4_issues_no_a_update() {
    let provider = FakeProvider::new().with_zone("example.com", "Z1");
    let item = DnsConfigItem::new("T", "home.example.com").with_ip4(false);

    let result = reconcile_item(&provider, &item, &both_families())
        .await
        .unwrap();

    assert!(result.ip4.is_none());
    assert!(result.ip6.is_some());
    assert_eq!(created_types(&provider), vec![RecordType::Aaaa]);
}

#[tokio::test]
async fn undiscovered_family_is_skipped() {
    let provider = FakeProvider::new().with_zone("example.com", "Z1");
    let item = DnsConfigItem::new("T", "home.example.com");
    let ips = DiscoveredIps::new(Some("1.2.3.4".parse().unwrap()), None);

    let result = reconcile_item(&provider, &item, &ips).await.unwrap();

    assert!(result.ip6.is_none());
    assert_eq!(created_types(&provider), vec![RecordType::A]);
}

#[tokio::test]
async fn nothing_discovered_touches_nothing() {
    let provider = FakeProvider::new().with_zone("example.com", "Z1");
    let item = DnsConfigItem::new("T", "home.example.com");

    let result = reconcile_item(&provider, &item, &DiscoveredIps::default())
        .await
        .unwrap();

    assert!(result.is_empty());
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn a_record_is_reconciled_first() {
    let provider = FakeProvider::new().with_zone("example.com", "Z1");
    let item = DnsConfigItem::new("T", "home.example.com");

    reconcile_item(&provider, &item, &both_families())
        .await
        .unwrap();

    assert_eq!(created_types(&provider), vec![RecordType::A, RecordType::Aaaa]);
}

#[tokio::test]
async fn item_overrides_reach_the_provider() {
    let provider = FakeProvider::new().with_zone("example.com", "Z1");
    let item = DnsConfigItem::new("T", "home.example.com")
        .with_ttl(3600)
        .with_proxied(false);

    reconcile_item(&provider, &item, &both_families())
        .await
        .unwrap();

    for record in provider.records() {
        assert_eq!(record.spec.ttl, 3600);
        assert!(!record.spec.proxied);
    }
}

#[tokio::test]
async fn failing_a_record_stops_the_item() {
    let provider = FakeProvider::new();
    let item = DnsConfigItem::new("T", "home.example.com");

    let err = reconcile_item(&provider, &item, &both_families()).await;

    assert!(err.is_err());
    assert_eq!(provider.zone_lookups().len(), 1, "AAAA must not be attempted");
}
