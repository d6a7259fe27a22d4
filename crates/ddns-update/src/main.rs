// # ddns-update
//
// Thin runner over ddns-core. It is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Wiring the IP sources and the Cloudflare provider into a BatchUpdater
// 4. Running one batch, or one batch per interval until a shutdown signal
//
// No DNS logic lives here.
//
// ## Configuration
//
// ### Records (either a config file or the single-token variables)
// - `DDNS_CONFIG_FILE`: JSON file with `records`, `discovery` and `debug`
// - `DDNS_API_TOKEN`: API token used for every record in `DDNS_RECORDS`
// - `DDNS_RECORDS`: Comma-separated list of record names
// - `DDNS_IP4` / `DDNS_IP6`: Maintain A / AAAA records (default: true)
// - `DDNS_TTL`: Record TTL in seconds (default: 120)
// - `DDNS_PROXIED`: Proxy through Cloudflare (default: true)
//
// ### Discovery (override the config file when set)
// - `DDNS_IP4_URL`: IPv4 echo endpoint (default: https://checkip.amazonaws.com)
// - `DDNS_IP6_INTERFACE`: Interface holding the IPv6 address (default: enp1s0)
//
// ### Runtime
// - `DDNS_DEBUG`: Log discovered addresses and per-record results at info level
// - `DDNS_MODE`: `live` (default) or `dry-run`
// - `DDNS_INTERVAL_SECS`: Repeat every N seconds instead of running once
// - `DDNS_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
//
// ## Example
//
// ```bash
// export DDNS_API_TOKEN=your_token
// export DDNS_RECORDS=home.example.com,vpn.example.com
// export DDNS_IP6_INTERFACE=eth0
//
// ddns-update
// ```

use anyhow::{Context, Result};
use ddns_core::{BatchReport, BatchUpdater, DdnsConfig, DnsConfigItem, IpDiscoverer};
use ddns_provider_cloudflare::CloudflareFactory;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// - 0: Every record reconciled (or clean shutdown in periodic mode)
/// - 1: Configuration or startup error
/// - 2: Runtime error (discovery failed or a record failed)
#[derive(Debug, Clone, Copy)]
enum DdnsExitCode {
    /// Success or clean shutdown
    Success = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application settings
struct Settings {
    ddns: DdnsConfig,
    dry_run: bool,
    interval: Option<Duration>,
    log_level: String,
}

impl Settings {
    /// Load settings from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through a variable lookup
    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut ddns = match var("DDNS_CONFIG_FILE") {
            Some(path) => DdnsConfig::from_file(&path)
                .with_context(|| format!("Failed to load DDNS_CONFIG_FILE={}", path))?,
            None => DdnsConfig::new(records_from_lookup(&var)?),
        };

        if let Some(url) = var("DDNS_IP4_URL") {
            ddns.discovery.ip4_url = url;
        }
        if let Some(interface) = var("DDNS_IP6_INTERFACE") {
            ddns.discovery.ip6_interface = interface;
        }
        if let Some(debug) = var("DDNS_DEBUG") {
            ddns.debug = parse_bool("DDNS_DEBUG", &debug)?;
        }

        let dry_run = match var("DDNS_MODE").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("live") => false,
            Some("dry-run") => true,
            Some(other) => anyhow::bail!(
                "DDNS_MODE '{}' is not valid. Valid modes: live, dry-run",
                other
            ),
        };

        let interval = var("DDNS_INTERVAL_SECS")
            .map(|s| {
                s.parse::<u64>()
                    .with_context(|| format!("DDNS_INTERVAL_SECS must be a number. Got: {}", s))
            })
            .transpose()?
            .map(Duration::from_secs);

        Ok(Self {
            ddns,
            dry_run,
            interval,
            log_level: var("DDNS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the settings
    fn validate(&self) -> Result<()> {
        self.ddns.validate()?;

        if let Some(interval) = self.interval
            && !(10..=86_400).contains(&interval.as_secs())
        {
            anyhow::bail!(
                "DDNS_INTERVAL_SECS must be between 10 and 86400 seconds. Got: {}",
                interval.as_secs()
            );
        }

        if self.ddns.discovery.ip4_url.starts_with("http://") {
            warn!("DDNS_IP4_URL uses HTTP (not HTTPS). Consider using HTTPS.");
        }

        self.log_level()?;
        Ok(())
    }

    fn log_level(&self) -> Result<Level> {
        Ok(match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => anyhow::bail!(
                "DDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        })
    }
}

/// Build config items from the single-token variables
fn records_from_lookup(var: &impl Fn(&str) -> Option<String>) -> Result<Vec<DnsConfigItem>> {
    let api_token = var("DDNS_API_TOKEN").context(
        "DDNS_API_TOKEN is required when DDNS_CONFIG_FILE is not set. \
        Set it via: export DDNS_API_TOKEN=your_token",
    )?;

    let names: Vec<String> = var("DDNS_RECORDS")
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if names.is_empty() {
        anyhow::bail!(
            "DDNS_RECORDS must contain at least one record. \
            Set it via: export DDNS_RECORDS=home.example.com,vpn.example.com"
        );
    }

    let ip4 = var("DDNS_IP4")
        .map(|v| parse_bool("DDNS_IP4", &v))
        .transpose()?
        .unwrap_or(true);
    let ip6 = var("DDNS_IP6")
        .map(|v| parse_bool("DDNS_IP6", &v))
        .transpose()?
        .unwrap_or(true);
    let ttl = var("DDNS_TTL")
        .map(|v| {
            v.parse::<u32>()
                .with_context(|| format!("DDNS_TTL must be a number. Got: {}", v))
        })
        .transpose()?;
    let proxied = var("DDNS_PROXIED")
        .map(|v| parse_bool("DDNS_PROXIED", &v))
        .transpose()?;

    Ok(names
        .into_iter()
        .map(|name| {
            let mut item = DnsConfigItem::new(api_token.clone(), name)
                .with_ip4(ip4)
                .with_ip6(ip6);
            item.ttl = ttl;
            item.proxied = proxied;
            item
        })
        .collect())
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("{} must be true or false. Got: {}", key, value),
    }
}

fn main() -> ExitCode {
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    let log_level = match settings.log_level() {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration validation error: {}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    if let Err(e) = settings.validate() {
        error!("Configuration validation error: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!(
        "Configuration loaded: {} record(s)",
        settings.ddns.records.len()
    );

    // Items are processed one at a time; a single-threaded runtime is enough
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run(settings)).into()
}

/// Wire the components together and run
async fn run(settings: Settings) -> DdnsExitCode {
    let updater = match build_updater(&settings) {
        Ok(updater) => updater,
        Err(e) => {
            error!("Startup error: {:#}", e);
            return DdnsExitCode::ConfigError;
        }
    };

    match settings.interval {
        None => run_once(&updater).await,
        Some(interval) => run_periodic(&updater, interval).await,
    }
}

fn build_updater(settings: &Settings) -> Result<BatchUpdater> {
    let discovery = &settings.ddns.discovery;
    let discoverer = IpDiscoverer::new();

    #[cfg(feature = "http")]
    let discoverer = {
        info!("IPv4 source: {}", discovery.ip4_url);
        discoverer.with_ip4_source(Box::new(ddns_ip_http::HttpIpSource::from_config(
            discovery,
        )?))?
    };

    #[cfg(not(feature = "http"))]
    warn!("Built without the http feature: A records will not be updated");

    #[cfg(feature = "iface")]
    let discoverer = {
        info!("IPv6 source: interface {}", discovery.ip6_interface);
        discoverer.with_ip6_source(Box::new(ddns_ip_iface::InterfaceIpSource::from_config(
            discovery,
        )))?
    };

    #[cfg(not(feature = "iface"))]
    warn!("Built without the iface feature: AAAA records will not be updated");

    let factory = CloudflareFactory::new().with_dry_run(settings.dry_run);

    Ok(BatchUpdater::new(
        discoverer,
        Box::new(factory),
        settings.ddns.clone(),
    )?)
}

/// Run one batch and map its outcome to an exit code
async fn run_once(updater: &BatchUpdater) -> DdnsExitCode {
    match updater.run().await {
        Ok(report) => {
            log_report(&report);
            if report.is_success() {
                DdnsExitCode::Success
            } else {
                DdnsExitCode::RuntimeError
            }
        }
        Err(e) => {
            error!("Update failed: {}", e);
            DdnsExitCode::RuntimeError
        }
    }
}

/// Run batches back to back until a shutdown signal arrives
///
/// A signal received during a batch is picked up once the batch finishes, so
/// a run is never cut off between the lookup and the write of a record.
async fn run_periodic(updater: &BatchUpdater, interval: Duration) -> DdnsExitCode {
    let mut signals = match ShutdownSignals::new() {
        Ok(signals) => signals,
        Err(e) => {
            error!("Startup error: {:#}", e);
            return DdnsExitCode::ConfigError;
        }
    };

    info!("Running every {:?}", interval);

    loop {
        if !matches!(run_once(updater).await, DdnsExitCode::Success) {
            warn!("Batch finished with errors, retrying in {:?}", interval);
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            signal = signals.recv() => {
                info!("Received shutdown signal: {}", signal);
                return DdnsExitCode::Success;
            }
        }
    }
}

fn log_report(report: &BatchReport) {
    let elapsed = report.finished_at - report.started_at;
    let failed = report.failures().count();
    info!(
        "Batch finished in {}ms: {} record(s), {} failed ({})",
        elapsed.num_milliseconds(),
        report.items.len(),
        failed,
        report.ips
    );
    for outcome in report.failures() {
        if let Some(e) = &outcome.error {
            error!("{}: {}", outcome.name, e);
        }
    }
}

/// Shutdown signal handlers (SIGTERM, SIGINT)
///
/// Registered up front so signals delivered while a batch runs are queued.
#[cfg(unix)]
struct ShutdownSignals {
    sigterm: tokio::signal::unix::Signal,
    sigint: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    fn new() -> Result<Self> {
        Ok(Self {
            sigterm: signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?,
            sigint: signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?,
        })
    }

    /// Wait for the next signal and return its name
    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
        }
    }
}

/// Shutdown signal handler (CTRL-C only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
struct ShutdownSignals {
    ctrl_c: tokio::signal::windows::CtrlC,
}

#[cfg(not(unix))]
impl ShutdownSignals {
    fn new() -> Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c().context("Failed to setup CTRL-C handler")?,
        })
    }

    async fn recv(&mut self) -> &'static str {
        self.ctrl_c.recv().await;
        "SIGINT"
    }
}
