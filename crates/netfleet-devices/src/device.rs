/*!
 * Device records and the inventory data model.
 *
 * This module defines the device record consumed by the orchestration
 * layer: identity, platform tag, the ordered connection paths, the
 * connectivity flag, and the interface table.
 */
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use netfleet_core::types::Ipv4Interface;

/// Error type for device operations
#[derive(Error, Debug)]
pub enum DeviceError {
    /// The device is not connected
    #[error("Device not connected")]
    NotConnected,

    /// The named connection path does not exist on the device
    #[error("Unknown connection path: {0}")]
    UnknownPath(String),

    /// The named interface does not exist on the device
    #[error("Unknown interface: {0}")]
    UnknownInterface(String),

    /// Communication error with the device
    #[error("Communication error: {0}")]
    CommunicationError(String),

    /// Protocol-specific error
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// The device is in an invalid state for the operation
    #[error("Invalid device state: {0}")]
    InvalidState(String),

    /// Timeout error
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Other error
    #[error("Other error: {0}")]
    Other(String),

    /// Core error
    #[error("Core error: {0}")]
    Core(#[from] netfleet_core::error::Error),
}

/// Result type for device operations
pub type Result<T> = std::result::Result<T, DeviceError>;

/// Operating system tag of a managed device
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Platform {
    /// Classic IOS
    Ios,
    /// IOS XE
    IosXe,
    /// IOS XR
    IosXr,
    /// NX-OS
    Nxos,
    /// Any other platform tag
    Other(String),
}

impl Platform {
    /// Get the canonical string form of the tag
    pub fn as_str(&self) -> &str {
        match self {
            Platform::Ios => "ios",
            Platform::IosXe => "iosxe",
            Platform::IosXr => "iosxr",
            Platform::Nxos => "nxos",
            Platform::Other(s) => s,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Platform {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Platform::from(s))
    }
}

impl From<&str> for Platform {
    fn from(s: &str) -> Self {
        match s {
            "ios" => Platform::Ios,
            "iosxe" => Platform::IosXe,
            "iosxr" => Platform::IosXr,
            "nxos" => Platform::Nxos,
            other => Platform::Other(other.to_string()),
        }
    }
}

impl From<String> for Platform {
    fn from(s: String) -> Self {
        s.as_str().into()
    }
}

impl From<Platform> for String {
    fn from(p: Platform) -> Self {
        p.as_str().to_string()
    }
}

/// Transport protocol of a connection path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum PathProtocol {
    /// Secure shell
    Ssh,
    /// Telnet
    Telnet,
    /// Any other transport tag
    Other(String),
}

impl PathProtocol {
    /// Get the canonical string form of the tag
    pub fn as_str(&self) -> &str {
        match self {
            PathProtocol::Ssh => "ssh",
            PathProtocol::Telnet => "telnet",
            PathProtocol::Other(s) => s,
        }
    }
}

impl fmt::Display for PathProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for PathProtocol {
    fn from(s: &str) -> Self {
        match s {
            "ssh" => PathProtocol::Ssh,
            "telnet" => PathProtocol::Telnet,
            other => PathProtocol::Other(other.to_string()),
        }
    }
}

impl From<String> for PathProtocol {
    fn from(s: String) -> Self {
        s.as_str().into()
    }
}

impl From<PathProtocol> for String {
    fn from(p: PathProtocol) -> Self {
        p.as_str().to_string()
    }
}

/// One named way to reach a device
///
/// Immutable once listed on a device record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionPath {
    name: String,
    protocol: PathProtocol,
}

impl ConnectionPath {
    /// Create a new connection path
    pub fn new<N: Into<String>, P: Into<PathProtocol>>(name: N, protocol: P) -> Self {
        Self {
            name: name.into(),
            protocol: protocol.into(),
        }
    }

    /// Get the path name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the transport protocol tag
    pub fn protocol(&self) -> &PathProtocol {
        &self.protocol
    }
}

/// A network interface on a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceRecord {
    /// The interface name
    pub name: String,
    /// The resolved IPv4 interface address, if known
    pub ipv4: Option<Ipv4Interface>,
}

impl InterfaceRecord {
    /// Create a new interface record with no resolved address
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            ipv4: None,
        }
    }
}

/// An inventory entry describing one manageable network device
///
/// Identity, platform and the connection-path list are fixed at
/// construction. The connectivity flag and the interface table are the
/// only mutable state; both are mutated exclusively by the worker
/// currently processing the device, through
/// [`DeviceOps`](crate::ops::DeviceOps) calls and address collection.
#[derive(Debug)]
pub struct DeviceRecord {
    name: String,
    os: Platform,
    connections: Vec<ConnectionPath>,
    connected: AtomicBool,
    interfaces: RwLock<BTreeMap<String, InterfaceRecord>>,
}

impl DeviceRecord {
    /// Create a new device record
    pub fn new<N: Into<String>, P: Into<Platform>>(name: N, os: P) -> Self {
        Self {
            name: name.into(),
            os: os.into(),
            connections: Vec::new(),
            connected: AtomicBool::new(false),
            interfaces: RwLock::new(BTreeMap::new()),
        }
    }

    /// Add a connection path, preserving declaration order
    pub fn with_connection(mut self, path: ConnectionPath) -> Self {
        self.connections.push(path);
        self
    }

    /// Add an interface with no resolved address
    pub fn with_interface<N: Into<String>>(self, name: N) -> Self {
        let record = InterfaceRecord::new(name);
        self.write_interfaces().insert(record.name.clone(), record);
        self
    }

    /// Get the device name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the operating system tag
    pub fn os(&self) -> &Platform {
        &self.os
    }

    /// Get the connection paths in declared order
    pub fn connections(&self) -> &[ConnectionPath] {
        &self.connections
    }

    /// Look up a connection path by name
    pub fn connection(&self, name: &str) -> Option<&ConnectionPath> {
        self.connections.iter().find(|c| c.name() == name)
    }

    /// Check whether the device currently has an established session
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Mark the device as connected
    ///
    /// Called by `DeviceOps` implementations once a session is up.
    pub fn mark_connected(&self) {
        self.connected.store(true, Ordering::Release);
    }

    /// Mark the device as disconnected
    ///
    /// Called by `DeviceOps` implementations on disconnect or when a
    /// failed attempt's state is discarded.
    pub fn mark_disconnected(&self) {
        self.connected.store(false, Ordering::Release);
    }

    /// Get the number of interfaces on the device
    pub fn interface_count(&self) -> usize {
        self.read_interfaces().len()
    }

    /// Get the interface names in stable order
    pub fn interface_names(&self) -> Vec<String> {
        self.read_interfaces().keys().cloned().collect()
    }

    /// Get a snapshot of the interface table
    pub fn interfaces(&self) -> BTreeMap<String, InterfaceRecord> {
        self.read_interfaces().clone()
    }

    /// Get the resolved address of an interface, if any
    pub fn interface_ipv4(&self, name: &str) -> Option<Ipv4Interface> {
        self.read_interfaces().get(name).and_then(|i| i.ipv4)
    }

    /// Store a resolved address on an interface
    pub fn set_interface_ipv4(&self, name: &str, ipv4: Ipv4Interface) -> Result<()> {
        match self.write_interfaces().get_mut(name) {
            Some(interface) => {
                interface.ipv4 = Some(ipv4);
                Ok(())
            }
            None => Err(DeviceError::UnknownInterface(name.to_string())),
        }
    }

    fn read_interfaces(&self) -> RwLockReadGuard<'_, BTreeMap<String, InterfaceRecord>> {
        self.interfaces.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_interfaces(&self) -> RwLockWriteGuard<'_, BTreeMap<String, InterfaceRecord>> {
        self.interfaces.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_device() -> DeviceRecord {
        DeviceRecord::new("edge-1", "iosxe")
            .with_connection(ConnectionPath::new("mgmt", "ssh"))
            .with_connection(ConnectionPath::new("console", "telnet"))
            .with_interface("GigabitEthernet1")
    }

    #[test]
    fn test_platform_tags() {
        assert_eq!(Platform::from("iosxe"), Platform::IosXe);
        assert_eq!(Platform::from("linux"), Platform::Other("linux".to_string()));
        assert_eq!(Platform::Nxos.to_string(), "nxos");
    }

    #[test]
    fn test_connection_lookup_preserves_order() {
        let device = sample_device();
        let names: Vec<&str> = device.connections().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["mgmt", "console"]);
        assert_eq!(
            device.connection("mgmt").unwrap().protocol(),
            &PathProtocol::Ssh
        );
        assert!(device.connection("oob").is_none());
    }

    #[test]
    fn test_connectivity_flag() {
        let device = sample_device();
        assert!(!device.is_connected());
        device.mark_connected();
        assert!(device.is_connected());
        device.mark_disconnected();
        assert!(!device.is_connected());
    }

    #[test]
    fn test_interface_addresses() {
        let device = sample_device();
        assert_eq!(device.interface_count(), 1);
        assert_eq!(device.interface_ipv4("GigabitEthernet1"), None);

        let ip = "10.0.0.1/24".parse().unwrap();
        device.set_interface_ipv4("GigabitEthernet1", ip).unwrap();
        assert_eq!(device.interface_ipv4("GigabitEthernet1"), Some(ip));

        assert!(matches!(
            device.set_interface_ipv4("Loopback0", ip),
            Err(DeviceError::UnknownInterface(_))
        ));
    }
}
