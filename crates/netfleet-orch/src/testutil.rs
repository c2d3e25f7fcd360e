/*!
 * Shared test fixtures: a scripted device-operations fake with call
 * instrumentation, and registry/config builders.
 */
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use netfleet_core::config::OrchestrationConfig;
use netfleet_core::types::Value;
use netfleet_devices::device::Result as DeviceResult;
use netfleet_devices::{
    ConnectionPath, DeviceError, DeviceOps, DeviceRecord, DeviceRegistry, DiscoveryProtocol,
};

type DeviceKey = (String, String);
type ProtocolKey = (String, DiscoveryProtocol);

/// A scripted `DeviceOps` fake
///
/// Outcomes are keyed by device (and path/protocol/interface); every
/// call is recorded, and connect attempts track how many were in
/// flight simultaneously.
#[derive(Debug, Default)]
pub(crate) struct MockOps {
    connect_delay: Duration,
    failing_paths: HashSet<DeviceKey>,
    verified: HashSet<ProtocolKey>,
    failing_verifies: HashSet<ProtocolKey>,
    failing_configures: HashSet<ProtocolKey>,
    failing_unconfigures: HashSet<ProtocolKey>,
    failing_neighbors: HashSet<ProtocolKey>,
    neighbor_tables: HashMap<ProtocolKey, Value>,
    interface_addresses: HashMap<DeviceKey, String>,

    connect_attempts: Mutex<Vec<DeviceKey>>,
    destroy_calls: Mutex<Vec<String>>,
    verify_calls: Mutex<Vec<ProtocolKey>>,
    configure_calls: Mutex<Vec<ProtocolKey>>,
    unconfigure_calls: Mutex<Vec<ProtocolKey>>,
    neighbor_calls: Mutex<Vec<ProtocolKey>>,
    address_calls: Mutex<Vec<DeviceKey>>,

    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockOps {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    pub(crate) fn failing_path(mut self, device: &str, via: &str) -> Self {
        self.failing_paths
            .insert((device.to_string(), via.to_string()));
        self
    }

    pub(crate) fn verified(mut self, device: &str, protocol: DiscoveryProtocol) -> Self {
        self.verified.insert((device.to_string(), protocol));
        self
    }

    pub(crate) fn failing_verify(mut self, device: &str, protocol: DiscoveryProtocol) -> Self {
        self.failing_verifies.insert((device.to_string(), protocol));
        self
    }

    pub(crate) fn failing_configure(mut self, device: &str, protocol: DiscoveryProtocol) -> Self {
        self.failing_configures
            .insert((device.to_string(), protocol));
        self
    }

    pub(crate) fn failing_unconfigure(mut self, device: &str, protocol: DiscoveryProtocol) -> Self {
        self.failing_unconfigures
            .insert((device.to_string(), protocol));
        self
    }

    pub(crate) fn failing_neighbors(mut self, device: &str, protocol: DiscoveryProtocol) -> Self {
        self.failing_neighbors
            .insert((device.to_string(), protocol));
        self
    }

    pub(crate) fn neighbor_table(
        mut self,
        device: &str,
        protocol: DiscoveryProtocol,
        table: Value,
    ) -> Self {
        self.neighbor_tables
            .insert((device.to_string(), protocol), table);
        self
    }

    pub(crate) fn interface_address(mut self, device: &str, interface: &str, address: &str) -> Self {
        self.interface_addresses
            .insert((device.to_string(), interface.to_string()), address.to_string());
        self
    }

    pub(crate) fn connect_attempts(&self) -> Vec<DeviceKey> {
        self.lock(&self.connect_attempts).clone()
    }

    pub(crate) fn destroy_calls(&self) -> Vec<String> {
        self.lock(&self.destroy_calls).clone()
    }

    pub(crate) fn verify_calls(&self) -> Vec<ProtocolKey> {
        self.lock(&self.verify_calls).clone()
    }

    pub(crate) fn configure_calls(&self) -> Vec<ProtocolKey> {
        self.lock(&self.configure_calls).clone()
    }

    pub(crate) fn unconfigure_calls(&self) -> Vec<ProtocolKey> {
        self.lock(&self.unconfigure_calls).clone()
    }

    pub(crate) fn neighbor_calls(&self) -> Vec<ProtocolKey> {
        self.lock(&self.neighbor_calls).clone()
    }

    pub(crate) fn address_calls(&self) -> Vec<DeviceKey> {
        self.lock(&self.address_calls).clone()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn lock<'a, T>(&self, mutex: &'a Mutex<T>) -> MutexGuard<'a, T> {
        mutex.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl DeviceOps for MockOps {
    async fn connect(
        &self,
        device: &DeviceRecord,
        via: &str,
        _timeout: Duration,
    ) -> DeviceResult<()> {
        self.lock(&self.connect_attempts)
            .push((device.name().to_string(), via.to_string()));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self
            .failing_paths
            .contains(&(device.name().to_string(), via.to_string()))
        {
            return Err(DeviceError::CommunicationError(format!(
                "connection refused on {}",
                via
            )));
        }

        device.mark_connected();
        Ok(())
    }

    async fn destroy(&self, device: &DeviceRecord) -> DeviceResult<()> {
        self.lock(&self.destroy_calls)
            .push(device.name().to_string());
        device.mark_disconnected();
        Ok(())
    }

    async fn verify_protocol_in_state(
        &self,
        device: &DeviceRecord,
        protocol: DiscoveryProtocol,
        _max_time: Duration,
        _check_interval: Duration,
    ) -> DeviceResult<bool> {
        let key = (device.name().to_string(), protocol);
        self.lock(&self.verify_calls).push(key.clone());

        if self.failing_verifies.contains(&key) {
            return Err(DeviceError::ProtocolError(format!(
                "{} state unreadable",
                protocol
            )));
        }
        Ok(self.verified.contains(&key))
    }

    async fn configure_protocol(
        &self,
        device: &DeviceRecord,
        protocol: DiscoveryProtocol,
    ) -> DeviceResult<()> {
        let key = (device.name().to_string(), protocol);
        self.lock(&self.configure_calls).push(key.clone());

        if self.failing_configures.contains(&key) {
            return Err(DeviceError::ProtocolError(format!(
                "could not enable {}",
                protocol
            )));
        }
        Ok(())
    }

    async fn unconfigure_protocol(
        &self,
        device: &DeviceRecord,
        protocol: DiscoveryProtocol,
    ) -> DeviceResult<()> {
        let key = (device.name().to_string(), protocol);
        self.lock(&self.unconfigure_calls).push(key.clone());

        if self.failing_unconfigures.contains(&key) {
            return Err(DeviceError::ProtocolError(format!(
                "could not disable {}",
                protocol
            )));
        }
        Ok(())
    }

    async fn get_neighbors_info(
        &self,
        device: &DeviceRecord,
        protocol: DiscoveryProtocol,
    ) -> DeviceResult<Value> {
        let key = (device.name().to_string(), protocol);
        self.lock(&self.neighbor_calls).push(key.clone());

        if self.failing_neighbors.contains(&key) {
            return Err(DeviceError::CommunicationError(format!(
                "{} neighbor fetch failed",
                protocol
            )));
        }
        Ok(self
            .neighbor_tables
            .get(&key)
            .cloned()
            .unwrap_or_else(Value::empty_object))
    }

    async fn get_interface_ipv4_address(
        &self,
        device: &DeviceRecord,
        interface: &str,
    ) -> DeviceResult<Option<String>> {
        let key = (device.name().to_string(), interface.to_string());
        self.lock(&self.address_calls).push(key.clone());

        Ok(self.interface_addresses.get(&key).cloned())
    }
}

/// A default orchestration configuration for tests
pub(crate) fn default_config() -> OrchestrationConfig {
    OrchestrationConfig::default()
}

/// A registry pre-populated with the given devices
pub(crate) fn registry_with(devices: Vec<DeviceRecord>) -> Arc<DeviceRegistry> {
    let registry = DeviceRegistry::new();
    for device in devices {
        registry.register(device).unwrap();
    }
    Arc::new(registry)
}

/// A connected device with one ssh management path
pub(crate) fn connected_device(name: &str, os: &str) -> DeviceRecord {
    let device = DeviceRecord::new(name, os).with_connection(ConnectionPath::new("mgmt", "ssh"));
    device.mark_connected();
    device
}

/// A no-expectation ops fake usable where behavior is irrelevant
pub(crate) fn mock_ops() -> Arc<dyn DeviceOps> {
    Arc::new(MockOps::new())
}
