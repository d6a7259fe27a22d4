//! Batch update engine
//!
//! The BatchUpdater is responsible for:
//! - Discovering the current addresses once per run
//! - Building a provider client from each config item's credential
//! - Reconciling each item's A/AAAA records, one item at a time
//! - Recording a per-item outcome so one failure does not stop the batch
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐
//! │ IpDiscoverer │─── DiscoveredIps (once) ───┐
//! └──────────────┘                            │
//!                                             ▼
//!                                    ┌────────────────┐
//!                                    │ BatchUpdater   │
//!                                    └────────────────┘
//!                                             │  for each item, in order
//!                         ┌───────────────────┴───────────────────┐
//!                         ▼                                       ▼
//!              ┌─────────────────────┐                 ┌─────────────────────┐
//!              │ DnsProviderFactory  │── client ──────▶│ reconcile_item      │
//!              │ (item.api_token)    │                 │ (upsert A / AAAA)   │
//!              └─────────────────────┘                 └─────────────────────┘
//! ```
//!
//! Items run serially. This bounds outbound calls against the provider and
//! keeps every error attributable to a single item.

use crate::config::{DdnsConfig, DnsConfigItem};
use crate::discovery::{DiscoveredIps, IpDiscoverer};
use crate::error::{Error, Result};
use crate::reconcile::{reconcile_item, ItemResult};
use crate::traits::{DnsProviderFactory, IpVersion};
use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

/// Outcome of one config item
#[derive(Debug)]
pub struct ItemOutcome {
    /// Record name of the item
    pub name: String,
    /// Records written for the item, including any written before it failed
    pub updated: ItemResult,
    /// Error that made the item fail
    pub error: Option<Error>,
}

impl ItemOutcome {
    /// Whether the item failed
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Summary of one batch run
#[derive(Debug)]
pub struct BatchReport {
    /// Addresses used for every item
    pub ips: DiscoveredIps,
    /// One outcome per config item, in input order
    pub items: Vec<ItemOutcome>,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the last item finished
    pub finished_at: DateTime<Utc>,
}

impl BatchReport {
    /// Items that failed
    pub fn failures(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.items.iter().filter(|outcome| outcome.is_failure())
    }

    /// Whether every item succeeded
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Core batch engine
///
/// ## Lifecycle
///
/// 1. Create with [`BatchUpdater::new()`]
/// 2. Call [`BatchUpdater::run()`] once per scheduled update
///
/// The engine holds no state between runs. Zone and record ids are looked up
/// fresh every time. Callers running it on a schedule must not start a run
/// while the previous one is still in flight.
pub struct BatchUpdater {
    /// Address discovery
    discoverer: IpDiscoverer,

    /// Builds one provider client per item credential
    factory: Box<dyn DnsProviderFactory>,

    /// Items to reconcile, in order
    items: Vec<DnsConfigItem>,

    /// Log discovered addresses and per-item results at info level
    debug: bool,
}

impl BatchUpdater {
    /// Create a new batch updater
    ///
    /// # Parameters
    ///
    /// - `discoverer`: IP discovery for this host
    /// - `factory`: Provider client factory
    /// - `config`: DDNS configuration (validated here)
    pub fn new(
        discoverer: IpDiscoverer,
        factory: Box<dyn DnsProviderFactory>,
        config: DdnsConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            discoverer,
            factory,
            items: config.records,
            debug: config.debug,
        })
    }

    /// Run one batch
    ///
    /// Discovers addresses once, then reconciles every item against them.
    ///
    /// # Returns
    ///
    /// - `Ok(BatchReport)`: discovery succeeded; per-item failures are in the report
    /// - `Err(Error)`: no address could be discovered
    pub async fn run(&self) -> Result<BatchReport> {
        let started_at = Utc::now();

        let ips = self.discoverer.discover().await?;
        if self.debug {
            info!("Discovered addresses: {}", ips);
        } else {
            debug!("Discovered addresses: {}", ips);
        }

        let mut items = Vec::with_capacity(self.items.len());
        for item in &self.items {
            let outcome = self.run_item(item, &ips).await;

            match &outcome.error {
                None if self.debug => {
                    info!("{}: {}", item.name, describe(&outcome.updated));
                }
                None => {
                    debug!("{}: {}", item.name, describe(&outcome.updated));
                }
                Some(e) => {
                    error!("Failed to update {}: {}", item.name, e);
                }
            }

            items.push(outcome);
        }

        Ok(BatchReport {
            ips,
            items,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Reconcile one item and record what happened
    ///
    /// An item fails when its upsert fails, or when a family it enabled has
    /// no address because discovery of that family failed. Records written
    /// for the other family are kept in the outcome.
    async fn run_item(&self, item: &DnsConfigItem, ips: &DiscoveredIps) -> ItemOutcome {
        if !item.enabled.ip4 && !item.enabled.ip6 {
            info!("{}: ip4 and ip6 disabled, skipping", item.name);
            return ItemOutcome {
                name: item.name.clone(),
                updated: ItemResult::default(),
                error: None,
            };
        }

        let (updated, error) = match self.update_item(item, ips).await {
            Ok(updated) => (updated, discovery_failure(item, ips)),
            Err(e) => (ItemResult::default(), Some(e)),
        };

        ItemOutcome {
            name: item.name.clone(),
            updated,
            error,
        }
    }

    /// Reconcile one item with a client built from its credential
    pub async fn update_item(
        &self,
        item: &DnsConfigItem,
        ips: &DiscoveredIps,
    ) -> Result<ItemResult> {
        let provider = self.factory.create(&item.api_token)?;
        debug!(
            "Updating {} via {}",
            item.name,
            provider.provider_name()
        );
        reconcile_item(provider.as_ref(), item, ips).await
    }
}

/// Discovery error for each family the item enabled but could not update
fn discovery_failure(item: &DnsConfigItem, ips: &DiscoveredIps) -> Option<Error> {
    let missing: Vec<String> = [
        (IpVersion::V4, item.enabled.ip4),
        (IpVersion::V6, item.enabled.ip6),
    ]
    .into_iter()
    .filter(|(_, enabled)| *enabled)
    .filter_map(|(version, _)| ips.error(version).map(|e| format!("{}: {}", version, e)))
    .collect();

    if missing.is_empty() {
        None
    } else {
        Some(Error::no_address(missing.join("; ")))
    }
}

fn describe(result: &ItemResult) -> String {
    let family = |r: &Option<crate::traits::UpdateResult>| match r {
        Some(crate::traits::UpdateResult::Created { .. }) => "created",
        Some(crate::traits::UpdateResult::Patched { .. }) => "patched",
        None => "skipped",
    };
    format!("A {}, AAAA {}", family(&result.ip4), family(&result.ip6))
}
