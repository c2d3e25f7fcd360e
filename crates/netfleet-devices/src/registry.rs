/*!
 * Device registry for netfleet.
 *
 * This module provides the inventory table consumed by the
 * orchestration layer. The registry is populated before a run starts
 * and is read-only while orchestration is in flight.
 */
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::device::{DeviceError, DeviceRecord};

/// Device registry
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    /// The registered devices, keyed by device name
    devices: RwLock<HashMap<String, Arc<DeviceRecord>>>,
}

impl DeviceRegistry {
    /// Create a new device registry
    pub fn new() -> Self {
        Self {
            devices: RwLock::new(HashMap::new()),
        }
    }

    /// Register a device with the registry
    pub fn register(&self, device: DeviceRecord) -> Result<(), DeviceError> {
        let name = device.name().to_string();

        let mut devices = self.devices.write().map_err(|_| {
            DeviceError::Other("Failed to acquire write lock on device registry".to_string())
        })?;

        if devices.contains_key(&name) {
            return Err(DeviceError::Other(format!(
                "Device {} already registered",
                name
            )));
        }

        devices.insert(name.clone(), Arc::new(device));
        debug!("Registered device {}", name);

        Ok(())
    }

    /// Get a device by name
    pub fn get(&self, name: &str) -> Result<Arc<DeviceRecord>, DeviceError> {
        let devices = self.devices.read().map_err(|_| {
            DeviceError::Other("Failed to acquire read lock on device registry".to_string())
        })?;

        devices
            .get(name)
            .cloned()
            .ok_or_else(|| DeviceError::Other(format!("Device {} not found", name)))
    }

    /// Get all registered devices
    pub fn devices(&self) -> Result<Vec<Arc<DeviceRecord>>, DeviceError> {
        let devices = self.devices.read().map_err(|_| {
            DeviceError::Other("Failed to acquire read lock on device registry".to_string())
        })?;

        Ok(devices.values().cloned().collect())
    }

    /// Get all registered device names
    pub fn names(&self) -> Result<Vec<String>, DeviceError> {
        let devices = self.devices.read().map_err(|_| {
            DeviceError::Other("Failed to acquire read lock on device registry".to_string())
        })?;

        Ok(devices.keys().cloned().collect())
    }

    /// Check if a device is registered
    pub fn contains(&self, name: &str) -> Result<bool, DeviceError> {
        let devices = self.devices.read().map_err(|_| {
            DeviceError::Other("Failed to acquire read lock on device registry".to_string())
        })?;

        Ok(devices.contains_key(name))
    }

    /// Count registered devices
    pub fn len(&self) -> Result<usize, DeviceError> {
        let devices = self.devices.read().map_err(|_| {
            DeviceError::Other("Failed to acquire read lock on device registry".to_string())
        })?;

        Ok(devices.len())
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> Result<bool, DeviceError> {
        Ok(self.len()? == 0)
    }
}
