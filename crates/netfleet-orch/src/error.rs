/*!
 * Error types for the netfleet orchestration crate.
 */
use thiserror::Error;

/// Error type for netfleet orchestration operations
///
/// Per-device failures inside a fan-out never surface here; they are
/// logged and absorbed at the unit of work. These errors are reserved
/// for contract violations and registry access problems raised before
/// a fan-out starts.
#[derive(Error, Debug)]
pub enum Error {
    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Device error
    #[error("Device error: {0}")]
    Device(#[from] netfleet_devices::DeviceError),

    /// Core error
    #[error("Core error: {0}")]
    Core(#[from] netfleet_core::error::Error),

    /// Other error
    #[error("Other error: {0}")]
    Other(String),
}

/// Result type for netfleet orchestration operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new validation error
    pub fn validation<S: AsRef<str>>(msg: S) -> Self {
        Error::Validation(msg.as_ref().to_string())
    }

    /// Create a new other error
    pub fn other<S: AsRef<str>>(msg: S) -> Self {
        Error::Other(msg.as_ref().to_string())
    }
}
