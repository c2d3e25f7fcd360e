/*!
 * Connection orchestration.
 *
 * Decides which devices need connecting, tries a preferred path first
 * when one is configured, then falls back to enumerating the device's
 * connection paths in declared order. Failed attempts discard their
 * session state so the next candidate starts clean.
 */
use std::sync::Arc;

use tracing::{debug, info, warn, Instrument};

use netfleet_core::logging::operation_span;
use netfleet_devices::{DeviceRecord, PathProtocol};

use crate::error::Result;
use crate::executor::BoundedExecutor;
use crate::orchestrator::FleetOrchestrator;

impl FleetOrchestrator {
    /// Connect every eligible device in the registry
    ///
    /// Eligible means: not already connected, a managed platform, and
    /// not in the visited set. At most `max_workers` connection
    /// attempts run simultaneously. Devices that cannot be reached stay
    /// disconnected; that is a per-device log entry, never a run-level
    /// error.
    pub async fn connect_all(self: &Arc<Self>, max_workers: usize) -> Result<()> {
        let executor = BoundedExecutor::new(max_workers)?;

        let targets: Vec<Arc<DeviceRecord>> = self
            .registry
            .devices()?
            .into_iter()
            .filter(|d| {
                !d.is_connected() && self.supports(d.os()) && !self.is_visited(d.name())
            })
            .collect();

        if targets.is_empty() {
            debug!("No devices need connecting");
            return Ok(());
        }

        info!(
            "Connecting {} devices ({} at a time)",
            targets.len(),
            max_workers
        );

        let orchestrator = Arc::clone(self);
        executor
            .run(targets, move |device| {
                let orchestrator = Arc::clone(&orchestrator);
                async move {
                    info!("Attempting to connect to {}", device.name());
                    orchestrator.connect_one(&device).await;
                }
            })
            .instrument(operation_span("connect_all", "fleet-orchestrator"))
            .await;

        Ok(())
    }

    /// Run one device's connection sequence
    ///
    /// Preferred path first when configured and present, then the
    /// declared-order fallback. The first successful path wins; every
    /// failure resets the device's connection state before the next
    /// candidate.
    pub(crate) async fn connect_one(&self, device: &DeviceRecord) {
        let timeout = self.config.attempt_timeout();

        if let Some(alias) = self.config.preferred_path(device.name()) {
            if device.connection(alias).is_some() {
                info!(
                    "Attempting to connect to {} via preferred path {}",
                    device.name(),
                    alias
                );
                if let Err(e) = self.ops.connect(device, alias, timeout).await {
                    info!(
                        "Failed to connect to {} via preferred path {}: {}",
                        device.name(),
                        alias,
                        e
                    );
                    self.reset_connection(device).await;
                }
            } else {
                // Likely a stale preferred-path entry in the
                // configuration; flagged distinctly before falling back
                // to plain enumeration.
                warn!(
                    "Device {} has no connection path named {}, falling back to enumeration",
                    device.name(),
                    alias
                );
            }
        }

        if device.is_connected() {
            return;
        }

        for path in device.connections() {
            if self.config.ssh_only && path.protocol() != &PathProtocol::Ssh {
                debug!(
                    "Skipping {} path {} on {}",
                    path.protocol(),
                    path.name(),
                    device.name()
                );
                continue;
            }

            match self.ops.connect(device, path.name(), timeout).await {
                Ok(()) => break,
                Err(e) => {
                    warn!(
                        "Failed to connect to {} via {}: {}",
                        device.name(),
                        path.name(),
                        e
                    );
                    self.reset_connection(device).await;
                }
            }
        }

        if !device.is_connected() {
            warn!("No connection path to {} succeeded", device.name());
        }
    }

    /// Discard a failed attempt's session state
    async fn reset_connection(&self, device: &DeviceRecord) {
        if let Err(e) = self.ops.destroy(device).await {
            debug!(
                "Failed to discard connection state for {}: {}",
                device.name(),
                e
            );
        }
    }
}
