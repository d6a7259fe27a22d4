// # ddns-core
//
// Core library for the DDNS record reconciler.
//
// ## Architecture Overview
//
// This library provides the core functionality for dynamic DNS updates:
// - **IpSource**: Trait for discovering the current address of one family
// - **IpDiscoverer**: Queries the IPv4 and IPv6 sources once per run
// - **DnsProvider**: Trait for looking up, creating and patching records
// - **reconcile**: Zone derivation and the idempotent create-or-patch upsert
// - **BatchUpdater**: Reconciles a list of per-domain configs, one at a time
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from provider and source crates
// 2. **Stateless**: Zone and record ids are resolved on every run, never cached
// 3. **Idempotency**: Upsert-by-lookup never creates duplicate records
// 4. **Isolation**: One failing domain does not stop the rest of the batch
// 5. **Library-First**: The binary is a thin layer over this crate

pub mod traits;
pub mod record;
pub mod discovery;
pub mod reconcile;
pub mod engine;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{DnsProvider, DnsProviderFactory, IpSource, IpVersion, UpdateResult};
pub use record::{DnsRecordSpec, RecordType, DEFAULT_PROXIED, DEFAULT_TTL};
pub use discovery::{DiscoveredIps, IpDiscoverer};
pub use reconcile::{ItemResult, reconcile_item, upsert_record, zone_root};
pub use engine::{BatchReport, BatchUpdater, ItemOutcome};
pub use config::{DdnsConfig, DiscoveryConfig, DnsConfigItem, RecordTypeEnabled};
pub use error::{Error, Result};
