//! Test doubles and common utilities for reconciliation contract tests
//!
//! The fake provider keeps zones and records in memory and logs every API
//! call, so tests can assert exactly which calls an operation issued.

#![allow(dead_code)]

use ddns_core::error::{Error, Result};
use ddns_core::traits::{DnsProvider, DnsProviderFactory, IpSource, IpVersion};
use ddns_core::{DnsRecordSpec, RecordType};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};

/// One call received by the fake provider
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ZoneLookup(String),
    RecordLookup {
        zone_id: String,
        name: String,
        record_type: RecordType,
    },
    Create {
        zone_id: String,
        spec: DnsRecordSpec,
    },
    Patch {
        zone_id: String,
        record_id: String,
        spec: DnsRecordSpec,
    },
}

/// A record stored by the fake provider
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: String,
    pub zone_id: String,
    pub spec: DnsRecordSpec,
}

#[derive(Default)]
struct Backend {
    zones: HashMap<String, String>,
    records: Vec<StoredRecord>,
    calls: Vec<Call>,
    tokens: Vec<String>,
    next_id: usize,
}

/// In-memory provider backend shared by every client built from it
#[derive(Clone, Default)]
pub struct FakeProvider {
    backend: Arc<Mutex<Backend>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a zone
    pub fn with_zone(self, name: &str, id: &str) -> Self {
        self.backend
            .lock()
            .unwrap()
            .zones
            .insert(name.to_string(), id.to_string());
        self
    }

    /// Seed an existing record
    pub fn with_record(self, zone_id: &str, id: &str, spec: DnsRecordSpec) -> Self {
        self.backend.lock().unwrap().records.push(StoredRecord {
            id: id.to_string(),
            zone_id: zone_id.to_string(),
            spec,
        });
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.backend.lock().unwrap().calls.clone()
    }

    pub fn records(&self) -> Vec<StoredRecord> {
        self.backend.lock().unwrap().records.clone()
    }

    pub fn create_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Create { .. }))
            .count()
    }

    pub fn patch_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Patch { .. }))
            .count()
    }

    /// Zone names passed to get_zone_id, in order
    pub fn zone_lookups(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::ZoneLookup(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    /// Credentials the factory built clients for, in order
    pub fn tokens(&self) -> Vec<String> {
        self.backend.lock().unwrap().tokens.clone()
    }

    fn record(&self, call: Call) {
        self.backend.lock().unwrap().calls.push(call);
    }
}

#[async_trait::async_trait]
impl DnsProvider for FakeProvider {
    async fn get_zone_id(&self, zone_name: &str) -> Result<String> {
        self.record(Call::ZoneLookup(zone_name.to_string()));
        self.backend
            .lock()
            .unwrap()
            .zones
            .get(zone_name)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("Zone not found: {}", zone_name)))
    }

    async fn get_dns_record_id(
        &self,
        zone_id: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<Option<String>> {
        self.record(Call::RecordLookup {
            zone_id: zone_id.to_string(),
            name: name.to_string(),
            record_type,
        });
        Ok(self
            .backend
            .lock()
            .unwrap()
            .records
            .iter()
            .find(|r| r.zone_id == zone_id && r.spec.name == name && r.spec.record_type == record_type)
            .map(|r| r.id.clone()))
    }

    async fn patch_dns_record(
        &self,
        zone_id: &str,
        record_id: &str,
        spec: &DnsRecordSpec,
    ) -> Result<Value> {
        self.record(Call::Patch {
            zone_id: zone_id.to_string(),
            record_id: record_id.to_string(),
            spec: spec.clone(),
        });
        let mut backend = self.backend.lock().unwrap();
        let record = backend
            .records
            .iter_mut()
            .find(|r| r.id == record_id)
            .ok_or_else(|| Error::provider("fake", format!("No record {}", record_id)))?;
        record.spec = spec.clone();
        Ok(json!({"success": true, "result": {"id": record_id}}))
    }

    async fn post_dns_record(&self, zone_id: &str, spec: &DnsRecordSpec) -> Result<Value> {
        self.record(Call::Create {
            zone_id: zone_id.to_string(),
            spec: spec.clone(),
        });
        let mut backend = self.backend.lock().unwrap();
        backend.next_id += 1;
        let id = format!("rec-{}", backend.next_id);
        backend.records.push(StoredRecord {
            id: id.clone(),
            zone_id: zone_id.to_string(),
            spec: spec.clone(),
        });
        Ok(json!({"success": true, "result": {"id": id}}))
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}

impl DnsProviderFactory for FakeProvider {
    fn create(&self, api_token: &str) -> Result<Box<dyn DnsProvider>> {
        self.backend
            .lock()
            .unwrap()
            .tokens
            .push(api_token.to_string());
        Ok(Box::new(self.clone()))
    }
}

/// An IP source with a fixed answer
pub struct FixedIpSource {
    version: IpVersion,
    answer: std::result::Result<IpAddr, String>,
}

impl FixedIpSource {
    pub fn ok(ip: &str) -> Box<dyn IpSource> {
        let ip: IpAddr = ip.parse().unwrap();
        Box::new(Self {
            version: if ip.is_ipv4() { IpVersion::V4 } else { IpVersion::V6 },
            answer: Ok(ip),
        })
    }

    pub fn failing(version: IpVersion, message: &str) -> Box<dyn IpSource> {
        Box::new(Self {
            version,
            answer: Err(message.to_string()),
        })
    }
}

#[async_trait::async_trait]
impl IpSource for FixedIpSource {
    async fn current(&self) -> Result<IpAddr> {
        self.answer.clone().map_err(Error::external_command)
    }

    fn version(&self) -> IpVersion {
        self.version
    }
}
