/*!
 * Collection orchestration.
 *
 * Gathers neighbor tables and interface addresses from eligible
 * devices. Per-device results always materialize (ineligible devices
 * yield a defined empty placeholder), and a fetch failure on one
 * protocol never suppresses the other's result.
 */
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{debug, error, info, warn, Instrument};

use netfleet_core::logging::operation_span;
use netfleet_core::types::{Ipv4Interface, Value};
use netfleet_devices::{DeviceRecord, DiscoveryProtocol};

use crate::error::Result;
use crate::executor::BoundedExecutor;
use crate::orchestrator::FleetOrchestrator;

/// Neighbor tables reported by one device, one per discovery protocol
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceNeighbors {
    /// The cdp neighbor table
    pub cdp: Value,
    /// The lldp neighbor table
    pub lldp: Value,
}

impl DeviceNeighbors {
    /// The placeholder for a device that was skipped or yielded nothing
    pub fn empty() -> Self {
        Self {
            cdp: Value::empty_object(),
            lldp: Value::empty_object(),
        }
    }

    /// Check whether both tables are empty
    pub fn is_empty(&self) -> bool {
        self.cdp.is_empty_object() && self.lldp.is_empty_object()
    }
}

impl Default for DeviceNeighbors {
    fn default() -> Self {
        Self::empty()
    }
}

impl FleetOrchestrator {
    /// Gather one device's neighbor tables
    ///
    /// Returns a single-entry mapping keyed by device name, ready to be
    /// merged into a combined result. A device that is disconnected, on
    /// an unmanaged platform, or in the visited set gets the empty
    /// placeholder entry; a fetch failure on one protocol is logged and
    /// yields the empty table for that protocol only.
    pub async fn collect_neighbor_info(
        &self,
        device: &DeviceRecord,
    ) -> HashMap<String, DeviceNeighbors> {
        let mut neighbors = DeviceNeighbors::empty();

        if self.supports(device.os()) && device.is_connected() && !self.is_visited(device.name())
        {
            match self
                .ops
                .get_neighbors_info(device, DiscoveryProtocol::Cdp)
                .await
            {
                Ok(table) => neighbors.cdp = table,
                Err(e) => error!(
                    "Exception occurred getting cdp info from {}: {}",
                    device.name(),
                    e
                ),
            }
            match self
                .ops
                .get_neighbors_info(device, DiscoveryProtocol::Lldp)
                .await
            {
                Ok(table) => neighbors.lldp = table,
                Err(e) => error!(
                    "Exception occurred getting lldp info from {}: {}",
                    device.name(),
                    e
                ),
            }
        } else {
            debug!("Skipping neighbor collection for {}", device.name());
        }

        HashMap::from([(device.name().to_string(), neighbors)])
    }

    /// Gather neighbor tables from the whole registry
    ///
    /// Fans out [`collect_neighbor_info`](Self::collect_neighbor_info)
    /// over every registered device outside the visited set and merges
    /// the per-device results into one combined mapping. Each worker
    /// owns a disjoint key, so the merge is a plain guarded insert.
    pub async fn collect_all_neighbor_info(
        self: &Arc<Self>,
        max_workers: usize,
    ) -> Result<HashMap<String, DeviceNeighbors>> {
        let executor = BoundedExecutor::new(max_workers)?;
        let devices: Vec<Arc<DeviceRecord>> = self
            .registry
            .devices()?
            .into_iter()
            .filter(|d| !self.is_visited(d.name()))
            .collect();

        info!("Collecting neighbor info from {} devices", devices.len());

        let combined: Arc<Mutex<HashMap<String, DeviceNeighbors>>> =
            Arc::new(Mutex::new(HashMap::new()));

        let orchestrator = Arc::clone(self);
        let sink = Arc::clone(&combined);
        executor
            .run(devices, move |device| {
                let orchestrator = Arc::clone(&orchestrator);
                let sink = Arc::clone(&sink);
                async move {
                    let report = orchestrator.collect_neighbor_info(&device).await;
                    sink.lock().unwrap_or_else(|e| e.into_inner()).extend(report);
                }
            })
            .instrument(operation_span("collect_neighbors", "fleet-orchestrator"))
            .await;

        let mut combined = combined.lock().unwrap_or_else(|e| e.into_inner());
        Ok(std::mem::take(&mut *combined))
    }

    /// Resolve addresses for one device's interfaces
    ///
    /// No-op when the device is disconnected, on an unmanaged platform,
    /// in the visited set, or has no interfaces. Only interfaces
    /// without a resolved address are queried; an already-resolved
    /// interface is never overwritten.
    pub async fn collect_interface_addresses(&self, device: &DeviceRecord) {
        if !device.is_connected()
            || !self.supports(device.os())
            || self.is_visited(device.name())
            || device.interface_count() == 0
        {
            return;
        }

        for interface in device.interface_names() {
            if device.interface_ipv4(&interface).is_some() {
                continue;
            }

            let address = match self
                .ops
                .get_interface_ipv4_address(device, &interface)
                .await
            {
                Ok(Some(address)) if !address.is_empty() => address,
                Ok(_) => continue,
                Err(e) => {
                    error!(
                        "Failed to fetch address of {} {}: {}",
                        device.name(),
                        interface,
                        e
                    );
                    continue;
                }
            };

            match address.parse::<Ipv4Interface>() {
                Ok(ipv4) => {
                    if let Err(e) = device.set_interface_ipv4(&interface, ipv4) {
                        warn!(
                            "Could not store address on {} {}: {}",
                            device.name(),
                            interface,
                            e
                        );
                    }
                }
                Err(e) => {
                    warn!(
                        "Device {} reported an unparsable address {:?} for {}: {}",
                        device.name(),
                        address,
                        interface,
                        e
                    );
                }
            }
        }
    }

    /// Resolve interface addresses across the whole registry
    pub async fn collect_all_interface_addresses(self: &Arc<Self>, max_workers: usize) -> Result<()> {
        let executor = BoundedExecutor::new(max_workers)?;
        let devices: Vec<Arc<DeviceRecord>> = self
            .registry
            .devices()?
            .into_iter()
            .filter(|d| !self.is_visited(d.name()))
            .collect();

        info!(
            "Collecting interface addresses from {} devices",
            devices.len()
        );

        let orchestrator = Arc::clone(self);
        executor
            .run(devices, move |device| {
                let orchestrator = Arc::clone(&orchestrator);
                async move {
                    orchestrator.collect_interface_addresses(&device).await;
                }
            })
            .instrument(operation_span("collect_addresses", "fleet-orchestrator"))
            .await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{connected_device, default_config, registry_with, MockOps};
    use netfleet_devices::{ConnectionPath, DeviceRecord};

    fn table(pairs: &[(&str, &str)]) -> Value {
        Value::Object(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), Value::from(*v)))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_ineligible_device_gets_placeholder() {
        let registry = registry_with(vec![DeviceRecord::new("edge-1", "iosxe")]);

        let ops = Arc::new(MockOps::new());
        let orchestrator = Arc::new(
            FleetOrchestrator::new(default_config(), registry, Arc::clone(&ops) as _).unwrap(),
        );

        let device = orchestrator.registry().get("edge-1").unwrap();
        let report = orchestrator.collect_neighbor_info(&device).await;

        assert_eq!(report.len(), 1);
        assert_eq!(report["edge-1"], DeviceNeighbors::empty());
        assert!(ops.neighbor_calls().is_empty());
    }

    #[tokio::test]
    async fn test_one_protocol_failing_keeps_the_other() {
        let registry = registry_with(vec![connected_device("edge-1", "iosxe")]);

        let cdp_table = table(&[("GigabitEthernet1", "edge-2")]);
        let ops = Arc::new(
            MockOps::new()
                .neighbor_table("edge-1", DiscoveryProtocol::Cdp, cdp_table.clone())
                .failing_neighbors("edge-1", DiscoveryProtocol::Lldp),
        );
        let orchestrator = Arc::new(
            FleetOrchestrator::new(default_config(), registry, Arc::clone(&ops) as _).unwrap(),
        );

        let device = orchestrator.registry().get("edge-1").unwrap();
        let report = orchestrator.collect_neighbor_info(&device).await;

        let neighbors = &report["edge-1"];
        assert_eq!(neighbors.cdp, cdp_table);
        assert!(neighbors.lldp.is_empty_object());
    }

    #[tokio::test]
    async fn test_combined_collection_covers_every_device() {
        let registry = registry_with(vec![
            connected_device("edge-1", "iosxe"),
            connected_device("edge-2", "nxos"),
            DeviceRecord::new("edge-3", "iosxe"),
        ]);

        let ops = Arc::new(
            MockOps::new()
                .neighbor_table(
                    "edge-1",
                    DiscoveryProtocol::Cdp,
                    table(&[("GigabitEthernet1", "edge-2")]),
                )
                .neighbor_table(
                    "edge-2",
                    DiscoveryProtocol::Lldp,
                    table(&[("Ethernet1/1", "edge-1")]),
                ),
        );
        let orchestrator = Arc::new(
            FleetOrchestrator::new(default_config(), registry, Arc::clone(&ops) as _).unwrap(),
        );

        let combined = orchestrator.collect_all_neighbor_info(2).await.unwrap();

        assert_eq!(combined.len(), 3);
        assert!(!combined["edge-1"].cdp.is_empty_object());
        assert!(!combined["edge-2"].lldp.is_empty_object());
        // The disconnected device is present with the placeholder.
        assert!(combined["edge-3"].is_empty());
    }

    #[tokio::test]
    async fn test_visited_devices_are_left_out_of_collection() {
        let visited = connected_device("edge-1", "iosxe").with_interface("GigabitEthernet1");
        let registry = registry_with(vec![visited, connected_device("edge-2", "iosxe")]);

        let ops = Arc::new(
            MockOps::new().interface_address("edge-1", "GigabitEthernet1", "10.0.0.1/24"),
        );
        let orchestrator = Arc::new(
            FleetOrchestrator::new(default_config(), registry, Arc::clone(&ops) as _)
                .unwrap()
                .with_visited(["edge-1"]),
        );

        let combined = orchestrator.collect_all_neighbor_info(2).await.unwrap();
        assert_eq!(combined.len(), 1);
        assert!(combined.contains_key("edge-2"));

        orchestrator.collect_all_interface_addresses(2).await.unwrap();
        let device = orchestrator.registry().get("edge-1").unwrap();
        assert_eq!(device.interface_ipv4("GigabitEthernet1"), None);
        assert!(ops.address_calls().is_empty());
    }

    #[tokio::test]
    async fn test_interface_addresses_fill_only_unresolved() {
        let device = connected_device("edge-1", "iosxe")
            .with_interface("GigabitEthernet1")
            .with_interface("GigabitEthernet2");
        device
            .set_interface_ipv4("GigabitEthernet1", "172.16.0.1/30".parse().unwrap())
            .unwrap();
        let registry = registry_with(vec![device]);

        let ops = Arc::new(
            MockOps::new()
                .interface_address("edge-1", "GigabitEthernet1", "10.9.9.9/24")
                .interface_address("edge-1", "GigabitEthernet2", "10.0.0.2/24"),
        );
        let orchestrator = Arc::new(
            FleetOrchestrator::new(default_config(), registry, Arc::clone(&ops) as _).unwrap(),
        );

        let device = orchestrator.registry().get("edge-1").unwrap();
        orchestrator.collect_interface_addresses(&device).await;

        // The resolved interface kept its address and was never queried.
        assert_eq!(
            device.interface_ipv4("GigabitEthernet1"),
            Some("172.16.0.1/30".parse().unwrap())
        );
        assert_eq!(
            device.interface_ipv4("GigabitEthernet2"),
            Some("10.0.0.2/24".parse().unwrap())
        );
        assert_eq!(
            ops.address_calls(),
            vec![("edge-1".to_string(), "GigabitEthernet2".to_string())]
        );
    }

    #[tokio::test]
    async fn test_interface_addresses_skip_ineligible_devices() {
        let no_interfaces = connected_device("edge-1", "iosxe");
        let disconnected = DeviceRecord::new("edge-2", "iosxe")
            .with_connection(ConnectionPath::new("mgmt", "ssh"))
            .with_interface("GigabitEthernet1");
        let registry = registry_with(vec![no_interfaces, disconnected]);

        let ops = Arc::new(MockOps::new());
        let orchestrator = Arc::new(
            FleetOrchestrator::new(default_config(), registry, Arc::clone(&ops) as _).unwrap(),
        );

        orchestrator.collect_all_interface_addresses(2).await.unwrap();
        assert!(ops.address_calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_and_unparsable_addresses_are_skipped() {
        let device = connected_device("edge-1", "iosxe")
            .with_interface("GigabitEthernet1")
            .with_interface("GigabitEthernet2");
        let registry = registry_with(vec![device]);

        let ops = Arc::new(
            MockOps::new()
                .interface_address("edge-1", "GigabitEthernet1", "")
                .interface_address("edge-1", "GigabitEthernet2", "not-an-address"),
        );
        let orchestrator = Arc::new(
            FleetOrchestrator::new(default_config(), registry, Arc::clone(&ops) as _).unwrap(),
        );

        let device = orchestrator.registry().get("edge-1").unwrap();
        orchestrator.collect_interface_addresses(&device).await;

        assert_eq!(device.interface_ipv4("GigabitEthernet1"), None);
        assert_eq!(device.interface_ipv4("GigabitEthernet2"), None);
    }
}
