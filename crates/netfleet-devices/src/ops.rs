/*!
 * The device-operations boundary.
 *
 * Everything effectful that touches a device flows through the
 * [`DeviceOps`] trait: session establishment, discovery-protocol
 * configuration, and data collection. The orchestration layer consumes
 * these calls and never owns transport, command syntax, or credentials.
 * Every call is fallible; callers pattern-match the returned
 * [`DeviceError`](crate::device::DeviceError) into success and
 * recoverable-failure branches instead of letting failures propagate.
 */
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use netfleet_core::types::Value;

use crate::device::{DeviceRecord, Result};

/// A neighbor-discovery protocol supported by managed devices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscoveryProtocol {
    /// Cisco Discovery Protocol
    Cdp,
    /// Link Layer Discovery Protocol
    Lldp,
}

impl DiscoveryProtocol {
    /// All supported discovery protocols
    pub const ALL: [DiscoveryProtocol; 2] = [DiscoveryProtocol::Cdp, DiscoveryProtocol::Lldp];

    /// Get the canonical string form of the protocol name
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscoveryProtocol::Cdp => "cdp",
            DiscoveryProtocol::Lldp => "lldp",
        }
    }
}

impl fmt::Display for DiscoveryProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Effectful per-device operations supplied by a device-automation layer
///
/// Implementations own the transport and command semantics. The
/// orchestrator only sequences calls and tracks outcomes.
#[async_trait]
pub trait DeviceOps: Send + Sync {
    /// Establish a session to the device via the named connection path
    ///
    /// Idempotent no-op if the device already has a session. A
    /// successful return leaves the device marked connected.
    async fn connect(&self, device: &DeviceRecord, via: &str, timeout: Duration) -> Result<()>;

    /// Discard a failed or stale connection attempt's state
    ///
    /// Leaves the device disconnected so a later attempt starts clean.
    async fn destroy(&self, device: &DeviceRecord) -> Result<()>;

    /// Poll until the protocol state matches the expectation or `max_time` elapses
    ///
    /// Returns whether the protocol was observed enabled.
    async fn verify_protocol_in_state(
        &self,
        device: &DeviceRecord,
        protocol: DiscoveryProtocol,
        max_time: Duration,
        check_interval: Duration,
    ) -> Result<bool>;

    /// Enable a discovery protocol on the device
    async fn configure_protocol(
        &self,
        device: &DeviceRecord,
        protocol: DiscoveryProtocol,
    ) -> Result<()>;

    /// Disable a discovery protocol on the device
    async fn unconfigure_protocol(
        &self,
        device: &DeviceRecord,
        protocol: DiscoveryProtocol,
    ) -> Result<()>;

    /// Fetch the device's neighbor table for a discovery protocol
    async fn get_neighbors_info(
        &self,
        device: &DeviceRecord,
        protocol: DiscoveryProtocol,
    ) -> Result<Value>;

    /// Fetch the IPv4 address string of a named interface
    ///
    /// An empty or absent value means the device reported no address.
    async fn get_interface_ipv4_address(
        &self,
        device: &DeviceRecord,
        interface: &str,
    ) -> Result<Option<String>>;
}
