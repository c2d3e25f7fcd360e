/*!
 * The fleet orchestrator.
 *
 * This module defines the orchestrator's construction and the shared
 * per-run state: the pre-seeded visited set and the per-protocol
 * record of devices whose configuration this run changed. The
 * connection, discovery and collection operations live in their own
 * modules as further `impl` blocks on [`FleetOrchestrator`].
 */
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use netfleet_core::config::OrchestrationConfig;
use netfleet_core::logging::component_span;
use netfleet_devices::{DeviceOps, DeviceRegistry, DiscoveryProtocol, Platform};

use crate::error::Result;

/// Per-protocol record of devices changed by this run
///
/// A device name lands here only after a verified successful enable
/// call, and is what scopes later reversion: devices that already had
/// a protocol enabled before the run are never present.
#[derive(Debug, Default)]
pub(crate) struct ConfiguredSets {
    cdp: Mutex<HashSet<String>>,
    lldp: Mutex<HashSet<String>>,
}

impl ConfiguredSets {
    fn set(&self, protocol: DiscoveryProtocol) -> &Mutex<HashSet<String>> {
        match protocol {
            DiscoveryProtocol::Cdp => &self.cdp,
            DiscoveryProtocol::Lldp => &self.lldp,
        }
    }

    fn lock(&self, protocol: DiscoveryProtocol) -> MutexGuard<'_, HashSet<String>> {
        self.set(protocol).lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Coordinates bulk, best-effort operations across a device fleet
///
/// One instance owns the state of one orchestration run: the read-only
/// configuration, the inventory, the device-operations boundary, the
/// pre-seeded visited set, and the per-protocol configured sets. All
/// fan-out methods resolve only once their entire batch has been
/// attempted; partial failures on individual devices are logged and
/// never abort a batch.
pub struct FleetOrchestrator {
    pub(crate) config: OrchestrationConfig,
    pub(crate) registry: Arc<DeviceRegistry>,
    pub(crate) ops: Arc<dyn DeviceOps>,
    pub(crate) visited: HashSet<String>,
    pub(crate) configured: ConfiguredSets,
}

impl FleetOrchestrator {
    /// Create a new orchestrator
    ///
    /// Malformed configuration is rejected here, before any fan-out can
    /// start.
    pub fn new(
        config: OrchestrationConfig,
        registry: Arc<DeviceRegistry>,
        ops: Arc<dyn DeviceOps>,
    ) -> Result<Self> {
        config.validate()?;

        let span = component_span("fleet-orchestrator", None);
        let _enter = span.enter();
        info!(
            "Created fleet orchestrator ({} max connections, ssh_only={})",
            config.max_connections, config.ssh_only
        );

        Ok(Self {
            config,
            registry,
            ops,
            visited: HashSet::new(),
            configured: ConfiguredSets::default(),
        })
    }

    /// Pre-seed device names excluded from this run entirely
    ///
    /// The visited set is only ever read afterwards; no orchestrator
    /// method adds to it.
    pub fn with_visited<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.visited.extend(names.into_iter().map(Into::into));
        self
    }

    /// Get the orchestration configuration
    pub fn config(&self) -> &OrchestrationConfig {
        &self.config
    }

    /// Get the device registry
    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// Get a snapshot of the devices this run enabled a protocol on
    pub fn configured_devices(&self, protocol: DiscoveryProtocol) -> HashSet<String> {
        self.configured.lock(protocol).clone()
    }

    /// Check whether a device is excluded from this run
    pub(crate) fn is_visited(&self, name: &str) -> bool {
        self.visited.contains(name)
    }

    /// Check whether this run already enabled a protocol on a device
    pub(crate) fn is_configured(&self, protocol: DiscoveryProtocol, name: &str) -> bool {
        self.configured.lock(protocol).contains(name)
    }

    /// Record that this run enabled a protocol on a device
    pub(crate) fn mark_configured(&self, protocol: DiscoveryProtocol, name: &str) {
        if self.configured.lock(protocol).insert(name.to_string()) {
            debug!("Marked {} as {}-configured by this run", name, protocol);
        }
    }

    /// Check whether a platform tag is managed by this run
    pub(crate) fn supports(&self, os: &Platform) -> bool {
        self.config.supports_platform(os.as_str())
    }
}
