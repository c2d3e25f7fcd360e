/*!
 * Discovery-protocol orchestration.
 *
 * Enables cdp/lldp on connected devices that need it, recording which
 * devices this run actually changed so that reversion later touches
 * exactly those and nothing else.
 */
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn, Instrument};

use netfleet_core::logging::operation_span;
use netfleet_devices::{DeviceRecord, DiscoveryProtocol};

use crate::error::Result;
use crate::executor::BoundedExecutor;
use crate::orchestrator::FleetOrchestrator;

/// Poll interval for the protocol-state verification probe
const VERIFY_POLL_INTERVAL: Duration = Duration::from_secs(5);

impl FleetOrchestrator {
    /// Enable a discovery protocol on every eligible device
    ///
    /// Eligible means: connected, a managed platform, not in the
    /// visited set, and not already marked as configured by this run.
    /// An empty selection returns immediately without spawning an
    /// executor. Devices the enable call fails on are logged and left
    /// unmarked.
    pub async fn configure_discovery_protocol(
        self: &Arc<Self>,
        protocol: DiscoveryProtocol,
    ) -> Result<()> {
        let targets: Vec<Arc<DeviceRecord>> = self
            .registry
            .devices()?
            .into_iter()
            .filter(|d| {
                d.is_connected()
                    && self.supports(d.os())
                    && !self.is_visited(d.name())
                    && !self.is_configured(protocol, d.name())
            })
            .collect();

        if targets.is_empty() {
            debug!("No devices need {} configuration", protocol);
            return Ok(());
        }

        info!("Configuring {} on {} devices", protocol, targets.len());

        let executor = BoundedExecutor::new(self.config.max_connections)?;
        let orchestrator = Arc::clone(self);
        executor
            .run(targets, move |device| {
                let orchestrator = Arc::clone(&orchestrator);
                async move {
                    orchestrator.configure_one(&device, protocol).await;
                }
            })
            .instrument(operation_span("configure_discovery", "fleet-orchestrator"))
            .await;

        Ok(())
    }

    /// Enable a discovery protocol on one device, idempotently
    ///
    /// Verifies current state first; a device already in state is left
    /// alone and unmarked. Only a verified successful enable call adds
    /// the device to the protocol's configured set.
    pub(crate) async fn configure_one(&self, device: &DeviceRecord, protocol: DiscoveryProtocol) {
        let max_time = self.config.attempt_timeout();

        match self
            .ops
            .verify_protocol_in_state(device, protocol, max_time, VERIFY_POLL_INTERVAL)
            .await
        {
            Ok(true) => {
                debug!("{} already enabled on {}", protocol, device.name());
                return;
            }
            Ok(false) => {}
            Err(e) => {
                // Enabling on top of an unknown protocol state would
                // leave the device in exactly the ambiguous condition
                // the configured set exists to rule out.
                warn!(
                    "Could not verify {} state on {}: {}",
                    protocol,
                    device.name(),
                    e
                );
                return;
            }
        }

        match self.ops.configure_protocol(device, protocol).await {
            Ok(()) => {
                self.mark_configured(protocol, device.name());
                debug!("Enabled {} on {}", protocol, device.name());
            }
            Err(e) => {
                error!(
                    "Exception configuring {} for {}: {}",
                    protocol,
                    device.name(),
                    e
                );
            }
        }
    }

    /// Disable the discovery protocols this run enabled on a device
    ///
    /// Restricted to protocols whose configured set contains the
    /// device; devices that already had a protocol enabled before the
    /// run are never touched. Failures are logged, never raised.
    pub async fn unconfigure_discovery_protocols(&self, device: &DeviceRecord) {
        for protocol in DiscoveryProtocol::ALL {
            if !self.is_configured(protocol, device.name()) {
                continue;
            }
            if let Err(e) = self.ops.unconfigure_protocol(device, protocol).await {
                error!(
                    "Error unconfiguring {} on {}: {}",
                    protocol,
                    device.name(),
                    e
                );
            }
        }
    }
}
