/*!
 * netfleet Devices
 *
 * This crate provides the device inventory model and the
 * device-operations boundary consumed by the netfleet orchestration
 * layer.
 */

#![warn(missing_docs)]

// Re-export core types
pub use netfleet_core::prelude;

pub mod device;
pub mod ops;
pub mod registry;

// Re-export the device model and the operations boundary
pub use device::{
    ConnectionPath, DeviceError, DeviceRecord, InterfaceRecord, PathProtocol, Platform,
};
pub use ops::{DeviceOps, DiscoveryProtocol};
pub use registry::DeviceRegistry;

/// netfleet devices crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the device system
pub fn init() -> Result<(), netfleet_core::error::Error> {
    tracing::info!("netfleet Devices {} initialized", VERSION);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
